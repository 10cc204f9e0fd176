use serde_json::Value;

/// Column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Ne(String, Value),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(column.into(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Ne(c, _) => c,
        }
    }

    /// Whether a row satisfies this predicate. A missing column reads as `null`.
    pub fn matches(&self, row: &crate::Row) -> bool {
        match self {
            Filter::Eq(c, v) => row.get(c).unwrap_or(&Value::Null) == v,
            Filter::Ne(c, v) => row.get(c).unwrap_or(&Value::Null) != v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// Select parameters: every filter must match (AND), then optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn ne(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::ne(column, value))
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            descending: true,
        });
        self
    }

    pub fn matches(&self, row: &crate::Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}
