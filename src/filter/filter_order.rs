use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts the JSON:API form (`-name,id`) as well as `name desc, id`.
    pub fn validate_and_parse(order: &str, columns: &[&str]) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in order.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(token) = it.next() else { continue };
            let (column, mut sort) = match token.strip_prefix('-') {
                Some(col) => (col, SortDirection::Desc),
                None => (token, SortDirection::Asc),
            };
            if let Some(dir) = it.next() {
                if dir.eq_ignore_ascii_case("desc") {
                    sort = SortDirection::Desc;
                }
            }
            if !columns.contains(&column) {
                return Err(FilterError::InvalidColumn(column.to_string()));
            }
            out.push(FilterOrderInfo { column: column.to_string(), sort });
        }
        Ok(out)
    }

    pub fn generate(table: &str, infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\".\"{}\" {}", table, i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
