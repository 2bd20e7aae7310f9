//! Lazy dataframes that compose into a single SQL query.

/// Entry point handed to dataframe script functions.
#[derive(Debug, Clone, Default)]
pub struct Session {
    _private: (),
}

impl Session {
    /// Creates a new session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a dataframe over a table or view.
    pub fn table(&self, name: impl Into<String>) -> DataFrame {
        DataFrame::new(Relation::Table(name.into()))
    }

    /// Returns a dataframe over the rows of a SQL query.
    pub fn sql(&self, query: impl Into<String>) -> DataFrame {
        let query = query.into();
        let query = query.trim().trim_end_matches(';').trim_end().to_string();
        DataFrame::new(Relation::Query(query))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Relation {
    Table(String),
    Query(String),
}

/// A lazily evaluated query built from a relation plus projections,
/// filters, ordering and a row limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    relation: Relation,
    select: Vec<String>,
    filter: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u64>,
}

impl DataFrame {
    fn new(relation: Relation) -> Self {
        Self {
            relation,
            select: Vec::new(),
            filter: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Replaces the projection.
    pub fn select<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = items.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a filter predicate. Predicates are combined with AND.
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.filter.push(predicate.into());
        self
    }

    /// Adds sort keys.
    pub fn sort<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Caps the number of rows. A smaller existing cap is kept.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(self.limit.map_or(n, |current| current.min(n)));
        self
    }

    /// Returns the generated SQL query, without a terminator.
    pub fn to_sql(&self) -> String {
        let projection = if self.select.is_empty() {
            "*".to_string()
        } else {
            self.select.join(", ")
        };

        let mut sql = match &self.relation {
            Relation::Table(name) => format!("SELECT {projection} FROM {name}"),
            Relation::Query(query) if self.is_plain() => return query.clone(),
            Relation::Query(query) => format!("SELECT {projection} FROM ({query}) AS q"),
        };

        if !self.filter.is_empty() {
            let predicates: Vec<String> = self.filter.iter().map(|p| format!("({p})")).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        sql
    }

    /// Returns the queries that evaluate this dataframe, in order.
    pub fn queries(&self) -> Vec<String> {
        vec![self.to_sql()]
    }

    fn is_plain(&self) -> bool {
        self.select.is_empty()
            && self.filter.is_empty()
            && self.order_by.is_empty()
            && self.limit.is_none()
    }
}
