/// WIQL query over the current user's work items, newest first.
///
/// The filter is interpolated into the query text as a literal without
/// escaping, so a filter containing `'` produces an invalid query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemQuery {
    pub filter: Option<String>,
    pub include_closed: bool,
}

impl WorkItemQuery {
    pub fn new(filter: Option<&str>, include_closed: bool) -> Self {
        Self {
            filter: filter.map(str::to_string),
            include_closed,
        }
    }

    pub fn to_wiql(&self) -> String {
        let mut wiql = String::from(
            "SELECT [System.Id],[System.Title],[System.State] FROM WorkItems WHERE [System.AssignedTo] = @Me",
        );

        if let Some(filter) = self.filter.as_deref().filter(|f| !f.trim().is_empty()) {
            if filter.contains('\'') {
                tracing::warn!(filter, "query filter contains a quote; the query will likely be rejected");
            }
            wiql.push_str(&format!(" AND [System.Title] CONTAINS '{filter}'"));
        }

        if !self.include_closed {
            wiql.push_str(" AND [State] <> 'Closed' AND [State] <> 'Removed'");
        }

        wiql.push_str(" ORDER BY [System.CreatedDate] desc");
        wiql
    }

    /// JSON body for the WIQL endpoint: `{"query": "<text>"}`.
    pub fn to_body(&self) -> String {
        serde_json::json!({ "query": self.to_wiql() }).to_string()
    }
}
