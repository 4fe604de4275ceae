use serde_json::{json, Value};

use super::error::FilterError;
use super::types::{ColumnKind, FilterOp, FilterWhereInfo};

/// Renders conditions into a parameterized SQL predicate.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Parse a client filter object (`{column: value}` or
    /// `{column: {"$op": value}}`) against the allowed columns.
    pub fn parse(
        where_data: &Value,
        columns: &[(&str, ColumnKind)],
    ) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(vec![]),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("filter must be a JSON object".to_string())),
        };

        let mut conditions = Vec::new();
        for (field, value) in obj {
            if field.starts_with('$') {
                return Err(FilterError::UnsupportedOperator(field.clone()));
            }
            let kind = Self::column_kind(columns, field)?;
            if let Value::Object(ops) = value {
                for (op_key, op_val) in ops {
                    let operator = Self::map_operator(op_key)?;
                    let data = Self::coerce(field, kind, operator, op_val)?;
                    conditions.push(FilterWhereInfo { column: field.clone(), operator, data });
                }
            } else {
                // Implicit equality: { field: value }
                let data = Self::coerce(field, kind, FilterOp::Eq, value)?;
                conditions.push(FilterWhereInfo { column: field.clone(), operator: FilterOp::Eq, data });
            }
        }
        Ok(conditions)
    }

    fn column_kind(columns: &[(&str, ColumnKind)], field: &str) -> Result<ColumnKind, FilterError> {
        columns
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| FilterError::InvalidColumn(field.to_string()))
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn coerce(field: &str, kind: ColumnKind, operator: FilterOp, value: &Value) -> Result<Value, FilterError> {
        match operator {
            FilterOp::In => {
                let values = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("$in on '{}' requires an array", field)))?;
                let coerced = values
                    .iter()
                    .map(|v| Self::coerce_scalar(field, kind, v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(coerced))
            }
            FilterOp::Like | FilterOp::ILike => match (kind, value) {
                (ColumnKind::Text, Value::String(_)) => Ok(value.clone()),
                _ => Err(FilterError::InvalidOperatorData(format!(
                    "pattern match on '{}' requires a text column and a string pattern",
                    field
                ))),
            },
            FilterOp::Eq | FilterOp::Ne if value.is_null() => Ok(Value::Null),
            _ => Self::coerce_scalar(field, kind, value),
        }
    }

    fn coerce_scalar(field: &str, kind: ColumnKind, value: &Value) -> Result<Value, FilterError> {
        let coerced = match (kind, value) {
            (ColumnKind::Integer, Value::Number(n)) => n.as_i64().map(|i| json!(i)),
            (ColumnKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(|i| json!(i)),
            (ColumnKind::Float, Value::Number(n)) => n.as_f64().map(|f| json!(f)),
            (ColumnKind::Float, Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| json!(f)),
            (ColumnKind::Text, Value::String(_)) => Some(value.clone()),
            (ColumnKind::Text, Value::Number(n)) => Some(Value::String(n.to_string())),
            _ => None,
        };
        coerced.ok_or_else(|| FilterError::InvalidOperatorData(format!("unexpected value for column '{}': {}", field, value)))
    }

    /// Render one condition on a table-qualified column
    pub fn condition(&mut self, table: &str, condition: &FilterWhereInfo) -> String {
        let quoted_column = format!("\"{}\".\"{}\"", table, condition.column);
        match condition.operator {
            FilterOp::Eq if condition.data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Ne if condition.data.is_null() => format!("{} IS NOT NULL", quoted_column),
            FilterOp::In => {
                let values = condition.data.as_array().cloned().unwrap_or_default();
                if values.is_empty() {
                    return "1=0".to_string();
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                format!("{} IN ({})", quoted_column, params.join(", "))
            }
            op => format!("{} {} {}", quoted_column, op.to_sql(), self.param(condition.data.clone())),
        }
    }

    pub fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }

    pub fn into_params(self) -> Vec<Value> {
        self.param_values
    }
}
