//! Metadata for the research tools.

use super::catalog::{ParamDef, ParamType, ToolEntry};

pub const SEARCH: &str = "search";
pub const FETCH: &str = "fetch";
pub const EVALUATE: &str = "evaluate";

/// `search(query, method?)`. The `method` parameter is only offered when
/// `methods` is non-empty.
pub fn search_tool(description: &str, methods: &[String]) -> ToolEntry {
    let mut parameters = vec![ParamDef::required(
        "query",
        ParamType::String,
        "Keywords to look for (case-insensitive)",
    )];
    if !methods.is_empty() {
        parameters.push(ParamDef::optional(
            "method",
            ParamType::String,
            &format!("Search method: one of {}", methods.join(", ")),
        ));
    }
    ToolEntry {
        name: SEARCH.to_string(),
        description: description.to_string(),
        parameters,
    }
}

/// `fetch(ids?, id?)`: at least one of the two is required at call time.
pub fn fetch_tool(description: &str) -> ToolEntry {
    ToolEntry {
        name: FETCH.to_string(),
        description: description.to_string(),
        parameters: vec![
            ParamDef::optional(
                "ids",
                ParamType::StringList,
                "Record ids to fetch; unknown ids are omitted",
            ),
            ParamDef::optional("id", ParamType::String, "Single record id to fetch"),
        ],
    }
}

/// `evaluate(query?)`.
pub fn evaluate_tool() -> ToolEntry {
    ToolEntry {
        name: EVALUATE.to_string(),
        description: "Run the coordinated packet evaluation and return per-record \
            outcomes and resolved funder variables."
            .to_string(),
        parameters: vec![ParamDef::optional(
            "query",
            ParamType::String,
            "Only evaluate records matching this query",
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_tool_method_param_optional() {
        let entry = search_tool("Search records", &["simple".to_string()]);
        assert_eq!(entry.parameters.len(), 2);
        assert!(!entry.parameters[1].is_required());
        assert_eq!(search_tool("x", &[]).parameters.len(), 1);
    }

    #[test]
    fn test_fetch_tool_has_no_required_params() {
        let schema = fetch_tool("Fetch").input_schema();
        assert_eq!(schema["required"], serde_json::json!([]));
    }
}
