//! jq pre-filter (jaq) selecting schema documents out of a larger input.
use anyhow::{anyhow, Context, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` over `input`; every output becomes one document.
pub fn select_documents(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(parse_errors)?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut documents = Vec::new();
    for (i, item) in outputs.enumerate() {
        let val = item.map_err(|e| anyhow!("jq filter `{filter_src}` failed: {e:?}"))?;
        // Val's Display is JSON text.
        let doc = serde_json::from_str::<Value>(&val.to_string())
            .with_context(|| format!("jq output #{i} is not JSON"))?;
        documents.push(doc);
    }
    tracing::debug!(filter = filter_src, outputs = documents.len(), "jq filter applied");
    Ok(documents)
}

fn parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .map(|(file, err)| format!("cannot parse jq filter `{}`: {err:?}", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

fn undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter()
                .map(move |(name, undef)| format!("undefined `{name}` ({undef:?}) in jq filter `{}`", file.code))
        })
        .collect();
    anyhow!(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_nested_documents() {
        let input = json!({"documents": [{"$defs": {"A": {}}}, {"$defs": {"B": {}}}]});
        let docs = select_documents(".documents[]", &input).unwrap();
        assert_eq!(docs, vec![json!({"$defs": {"A": {}}}), json!({"$defs": {"B": {}}})]);
    }

    #[test]
    fn bad_filters_are_errors() {
        assert!(select_documents(".[", &json!({})).is_err());
        assert!(select_documents("nope_not_defined", &json!({})).is_err());
    }
}
