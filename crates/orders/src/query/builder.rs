//! SELECT builder with PostgreSQL `$n` placeholders

use super::types::*;
use crate::backends::DatabaseValue;

/// Builder for the read-only SELECT statements the strategies issue
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    select_fields: Vec<String>,
    from_table: String,
    joins: Vec<JoinClause>,
    where_conditions: Vec<WhereCondition>,
    order_by: Vec<(String, OrderDirection)>,
    limit_count: Option<usize>,
    offset_value: Option<usize>,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a projected expression with an alias
    pub fn select_as(mut self, expr: &str, alias: &str) -> Self {
        self.select_fields.push(format!("{} AS {}", expr, alias));
        self
    }

    pub fn from(mut self, table: &str) -> Self {
        self.from_table = table.to_string();
        self
    }

    /// Add INNER JOIN to the query
    pub fn join(mut self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.joins.push(JoinClause {
            join_type: JoinType::Inner,
            table: table.to_string(),
            on: (left_col.to_string(), right_col.to_string()),
        });
        self
    }

    /// Add LEFT JOIN to the query
    pub fn left_join(mut self, table: &str, left_col: &str, right_col: &str) -> Self {
        self.joins.push(JoinClause {
            join_type: JoinType::Left,
            table: table.to_string(),
            on: (left_col.to_string(), right_col.to_string()),
        });
        self
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::Equal,
            values: vec![value.into()],
        });
        self
    }

    pub fn where_like(mut self, column: &str, pattern: impl Into<DatabaseValue>) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::Like,
            values: vec![pattern.into()],
        });
        self
    }

    pub fn where_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::In,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add ORDER BY clause (ascending)
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Asc));
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit_count = Some(count);
        self
    }

    pub fn offset(mut self, count: usize) -> Self {
        self.offset_value = Some(count);
        self
    }

    /// Number of bind parameters the statement will carry
    pub fn param_count(&self) -> usize {
        self.where_conditions.iter().map(|c| c.values.len()).sum()
    }

    /// Generate SQL with parameter placeholders and return parameters
    pub fn to_sql_with_params(&self) -> (String, Vec<DatabaseValue>) {
        let mut sql = String::from("SELECT ");
        let mut params = Vec::new();

        if self.select_fields.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.select_fields.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.from_table);

        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {} = {}",
                join.join_type, join.table, join.on.0, join.on.1
            ));
        }

        self.build_where_clause(&mut sql, &mut params);
        self.build_order_limit_clause(&mut sql);

        (sql, params)
    }

    fn build_where_clause(&self, sql: &mut String, params: &mut Vec<DatabaseValue>) {
        if self.where_conditions.is_empty() {
            return;
        }

        sql.push_str(" WHERE ");
        for (i, condition) in self.where_conditions.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            sql.push_str(&condition.column);
            sql.push(' ');
            sql.push_str(&condition.operator.to_string());

            match condition.operator {
                QueryOperator::In => {
                    let placeholders: Vec<String> = condition
                        .values
                        .iter()
                        .map(|value| {
                            params.push(value.clone());
                            format!("${}", params.len())
                        })
                        .collect();
                    sql.push_str(&format!(" ({})", placeholders.join(", ")));
                }
                QueryOperator::Equal | QueryOperator::Like => {
                    if let Some(value) = condition.values.first() {
                        params.push(value.clone());
                        sql.push_str(&format!(" ${}", params.len()));
                    }
                }
            }
        }
    }

    fn build_order_limit_clause(&self, sql: &mut String) {
        if !self.order_by.is_empty() {
            let columns: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&columns.join(", "));
        }

        if let Some(limit) = self.limit_count {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset_value {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }
}
