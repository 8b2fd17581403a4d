//! `query`: run a configured or ad-hoc query.

use std::fs;

use super::CommandContext;
use crate::analytics::top_n;
use crate::cli::QueryArgs;
use crate::config::QueryDefinition;
use crate::error::{DashError, Result};
use crate::query::QueryParams;
use crate::table::TabularResult;

/// Resolves the query definition the arguments name.
pub fn resolve_definition(ctx: &CommandContext<'_>, args: &QueryArgs) -> Result<QueryDefinition> {
    let mut definition = if let Some(sql) = &args.sql {
        QueryDefinition::new(sql.clone())
    } else if let Some(path) = &args.file {
        let sql = fs::read_to_string(path)
            .map_err(|e| DashError::io(format!("Failed to read {}: {e}", path.display())))?;
        QueryDefinition::new(sql)
    } else if let Some(name) = &args.name {
        ctx.config.get_query(name)?.clone()
    } else {
        return Err(DashError::config("No query given: pass a NAME, --sql or --file"));
    };

    for column in &args.numeric {
        if !definition.numeric.contains(column) {
            definition.numeric.push(column.clone());
        }
    }
    Ok(definition)
}

/// Parses repeated `NAME=VALUE` arguments.
pub fn parse_params(raw: &[String]) -> Result<QueryParams> {
    let mut params = QueryParams::new();
    for assignment in raw {
        let (name, value) = QueryParams::parse_assignment(assignment)?;
        params.insert(name, value);
    }
    Ok(params)
}

pub async fn handle_query(ctx: &CommandContext<'_>, args: &QueryArgs) -> Result<TabularResult> {
    let definition = resolve_definition(ctx, args)?;
    let params = parse_params(&args.params)?;
    let result = ctx.run(&definition, &params).await?;

    match &args.sort_by {
        Some(column) if !result.is_empty() => {
            let n = args.top.unwrap_or(result.row_count());
            top_n(&result, column, n, true)
        }
        _ => Ok(result),
    }
}
