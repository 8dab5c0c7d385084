//! SQL query builders.
//!
//! Generates parameterised statements for the persisted configuration
//! shape. Execution belongs to the host service.

const SCHEMA: &str = "recsys";

/// Columns of tracking_rules (id is assigned by the database).
pub fn get_rule_columns() -> Vec<&'static str> {
    vec![
        "name",
        "domain_id",
        "event_type_id",
        "target_value",
        "target_pattern_id",
        "target_operator_id",
        "action_type",
    ]
}

pub fn get_condition_columns() -> Vec<&'static str> {
    vec!["tracking_rule_id", "pattern_id", "operator_id", "value"]
}

pub fn get_mapping_columns() -> Vec<&'static str> {
    vec![
        "tracking_rule_id",
        "field",
        "source",
        "value",
        "request_url_pattern",
        "request_method",
        "request_body_path",
    ]
}

pub fn get_return_method_columns() -> Vec<&'static str> {
    vec![
        "domain_id",
        "configuration_name",
        "return_type",
        "value",
        "operator_id",
        "customizing",
        "layout",
        "style",
        "delay",
        "search_keyword_config_id",
    ]
}

pub fn get_event_columns() -> Vec<&'static str> {
    vec![
        "domain_id",
        "event_type_id",
        "user_field",
        "user_value",
        "item_field",
        "item_value",
        "timestamp",
        "rating_value",
        "review_value",
        "tracking_rule_id",
        "extras",
    ]
}

fn placeholders(count: usize, start: usize) -> Vec<String> {
    (start..start + count).map(|i| format!("${}", i)).collect()
}

fn insert(table: &str, columns: &[&str], returning_id: bool) -> String {
    let mut query = format!(
        "INSERT INTO {}.{} ({}) VALUES ({})",
        SCHEMA,
        table,
        columns.join(", "),
        placeholders(columns.len(), 1).join(", ")
    );
    if returning_id {
        query.push_str(" RETURNING id");
    }
    query
}

/// `UPDATE .. SET c1 = $1, .. WHERE id = $n+1`.
fn update_by_id(table: &str, columns: &[&str]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .zip(placeholders(columns.len(), 1))
        .map(|(column, ph)| format!("{} = {}", column, ph))
        .collect();
    format!(
        "UPDATE {}.{} SET {} WHERE id = ${}",
        SCHEMA,
        table,
        assignments.join(", "),
        columns.len() + 1
    )
}

pub fn build_rule_insert() -> String {
    insert("tracking_rules", &get_rule_columns(), true)
}

/// Updates every rule column except domain_id, which never changes.
pub fn build_rule_update() -> String {
    let columns: Vec<&str> = get_rule_columns()
        .into_iter()
        .filter(|c| *c != "domain_id")
        .collect();
    update_by_id("tracking_rules", &columns)
}

pub fn build_rule_delete() -> String {
    format!("DELETE FROM {}.tracking_rules WHERE id = $1", SCHEMA)
}

pub fn build_condition_insert() -> String {
    insert("conditions", &get_condition_columns(), false)
}

pub fn build_mapping_insert() -> String {
    insert("payload_mappings", &get_mapping_columns(), false)
}

/// Child rows are replaced wholesale on update.
pub fn build_rule_children_delete() -> [String; 2] {
    [
        format!("DELETE FROM {}.conditions WHERE tracking_rule_id = $1", SCHEMA),
        format!(
            "DELETE FROM {}.payload_mappings WHERE tracking_rule_id = $1",
            SCHEMA
        ),
    ]
}

pub fn build_rules_by_domain_select() -> String {
    format!(
        "SELECT id, {} FROM {}.tracking_rules WHERE domain_id = $1 ORDER BY id",
        get_rule_columns().join(", "),
        SCHEMA
    )
}

pub fn build_return_method_insert() -> String {
    insert("return_methods", &get_return_method_columns(), true)
}

pub fn build_return_method_update() -> String {
    let columns: Vec<&str> = get_return_method_columns()
        .into_iter()
        .filter(|c| *c != "domain_id")
        .collect();
    update_by_id("return_methods", &columns)
}

pub fn build_return_method_delete() -> String {
    format!("DELETE FROM {}.return_methods WHERE id = $1", SCHEMA)
}

/// Events are append-only; there is no update or delete builder.
pub fn build_event_insert() -> String {
    insert("events", &get_event_columns(), false)
}

pub fn build_domain_insert() -> String {
    insert("domains", &["key", "url", "created_at"], true)
}

pub fn build_domain_key_exists() -> String {
    format!("SELECT 1 FROM {}.domains WHERE key = $1", SCHEMA)
}
