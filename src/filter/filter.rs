use serde_json::json;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ColumnKind, FilterData, FilterJoin, FilterOrderInfo, FilterWhereInfo, SortDirection, SqlResult};

/// A listing query over one table: scope conditions, client filters,
/// an optional join, ordering and paging.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    columns: &'static [(&'static str, ColumnKind)],
    conditions: Vec<FilterWhereInfo>,
    join: Option<FilterJoin>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(
        table_name: impl Into<String>,
        columns: &'static [(&'static str, ColumnKind)],
    ) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_identifier(&table_name).map_err(FilterError::InvalidTableName)?;
        Ok(Self {
            table_name,
            columns,
            conditions: vec![],
            join: None,
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    /// Apply client-supplied filter, sort and paging
    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(&where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(&order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit, data.offset)?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: &serde_json::Value) -> Result<&mut Self, FilterError> {
        let parsed = FilterWhere::parse(conditions, self.columns)?;
        self.conditions.extend(parsed);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: &str) -> Result<&mut Self, FilterError> {
        let names: Vec<&str> = self.columns.iter().map(|(name, _)| *name).collect();
        self.order_data = FilterOrder::validate_and_parse(order_spec, &names)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 1 {
            return Err(FilterError::InvalidLimit("Page size must be positive".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Page number must be positive".to_string()));
            }
        }

        // Apply max page size from config
        let max_limit = crate::config::CONFIG.api.max_page_size;
        let applied_limit = if limit > max_limit {
            tracing::debug!("Page size {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    /// Scope restriction added by the server, not subject to column validation
    pub fn and_where(mut self, condition: FilterWhereInfo) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn join(mut self, join: FilterJoin) -> Result<Self, FilterError> {
        Self::validate_identifier(&join.table).map_err(FilterError::InvalidTableName)?;
        Self::validate_identifier(&join.foreign_key).map_err(FilterError::InvalidColumn)?;
        self.join = Some(join);
        Ok(self)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn conditions(&self) -> &[FilterWhereInfo] {
        &self.conditions
    }

    pub fn join_data(&self) -> Option<&FilterJoin> {
        self.join.as_ref()
    }

    pub fn limit_value(&self) -> Option<i32> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i32> {
        self.offset
    }

    /// Requested ordering, or `id ASC` so paging is stable
    pub fn order_infos(&self) -> Vec<FilterOrderInfo> {
        if self.order_data.is_empty() {
            vec![FilterOrderInfo { column: "id".to_string(), sort: SortDirection::Asc }]
        } else {
            self.order_data.clone()
        }
    }

    pub fn to_sql(&self) -> SqlResult {
        let (from_where, params) = self.build_from_where();
        let order_clause = FilterOrder::generate(&self.table_name, &self.order_infos());
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT \"{}\".*", self.table_name),
            from_where,
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    /// Total row count ignoring paging, for `meta.count`
    pub fn to_count_sql(&self) -> SqlResult {
        let (from_where, params) = self.build_from_where();
        SqlResult {
            query: format!("SELECT COUNT(*) AS count {}", from_where),
            params,
        }
    }

    fn build_from_where(&self) -> (String, Vec<serde_json::Value>) {
        let mut filter_where = FilterWhere::new(0);
        let mut from = format!("FROM \"{}\"", self.table_name);
        let mut predicates = vec![];

        if let Some(join) = &self.join {
            from.push_str(&format!(
                " JOIN \"{j}\" ON \"{j}\".\"{fk}\" = \"{t}\".\"id\"",
                j = join.table,
                fk = join.foreign_key,
                t = self.table_name
            ));
            predicates.push(format!("\"{}\".\"id\" = {}", join.table, filter_where.param(json!(join.id))));
        }
        for condition in &self.conditions {
            predicates.push(filter_where.condition(&self.table_name, condition));
        }

        let sql = if predicates.is_empty() {
            from
        } else {
            format!("{} WHERE {}", from, predicates.join(" AND "))
        };
        (sql, filter_where.into_params())
    }

    fn validate_identifier(name: &str) -> Result<(), String> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("Invalid identifier format: {:?}", name));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}
