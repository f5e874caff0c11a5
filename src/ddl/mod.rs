// src/ddl/mod.rs

//! The DDL Interpreter (§4.8): turns the small block-structured surface
//! language into Schema Manager calls.
//!
//! The DDL is a sequence of blocks `indicator { body }`. The tokenizer
//! locates a `{`, then its matching `}` by counting nesting — blocks nest
//! only within transformer bodies, never between top-level blocks
//! themselves, so a single depth counter started at the opening brace is
//! enough to find its partner.

use crate::error::{Error, Result};
use crate::schema::SchemaManager;

/// Splits `text` into top-level block pairs by brace-depth counting.
/// Trailing text with no further `{` is ignored, matching the source
/// grammar's tolerance for stray whitespace after the last block.
fn split_blocks(text: &str) -> Result<Vec<(String, String)>> {
    let mut blocks = Vec::new();
    let mut pos = 0usize;

    while let Some(rel_open) = text[pos..].find('{') {
        let open = pos + rel_open;
        let indicator = text[pos..open].trim().to_string();

        let mut depth = 1i32;
        let mut close = None;
        for (i, c) in text[open + 1..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(open + 1 + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| Error::SyntaxError {
            fragment: indicator.clone(),
            reason: "unbalanced braces".to_string(),
        })?;

        blocks.push((indicator, text[open + 1..close].to_string()));
        pos = close + 1;
    }

    Ok(blocks)
}

/// Splits `content` on every top-level comma (depth 0), trimming and
/// dropping empty elements. Used for `+attributes` bodies and class bodies,
/// where elements are always comma-delimited.
fn split_top_level(content: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in content.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(content[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(content[start..].to_string());
    parts.into_iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect()
}

/// The position of the first top-level (depth-0) comma in `content`, if any.
fn first_top_level_comma(content: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in content.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            ',' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Parses zero or more `get { source }` / `set { source }` transformer
/// blocks appended one after another with no separator required between
/// them — the datatype-block example in §6.2 places `get {...}` and
/// `set {...}` back to back on separate lines with no comma.
fn parse_transformer_blocks(mut rest: &str) -> Result<(Option<String>, Option<String>)> {
    let mut read_src = None;
    let mut write_src = None;

    rest = rest.trim();
    while !rest.is_empty() {
        let lower = rest.to_lowercase();
        let keyword_len = if lower.starts_with("get") {
            3
        } else if lower.starts_with("set") {
            3
        } else {
            return Err(Error::SyntaxError {
                fragment: rest.to_string(),
                reason: "expected 'get' or 'set' transformer block".to_string(),
            });
        };
        let is_get = lower.starts_with("get");
        let after_keyword = rest[keyword_len..].trim_start();
        if !after_keyword.starts_with('{') {
            return Err(Error::SyntaxError {
                fragment: rest.to_string(),
                reason: "expected '{' after 'get'/'set'".to_string(),
            });
        }

        let mut depth = 1i32;
        let mut close = None;
        for (i, c) in after_keyword[1..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| Error::SyntaxError {
            fragment: rest.to_string(),
            reason: "unbalanced braces in transformer block".to_string(),
        })?;

        let body = after_keyword[1..1 + close].to_string();
        if is_get {
            read_src = Some(body);
        } else {
            write_src = Some(body);
        }
        rest = after_keyword[1 + close + 1..].trim();
    }

    Ok((read_src, write_src))
}

/// Splits a class-body attribute element into its leading name token (the
/// attribute name, possibly `*`-suffixed) and the remaining transformer
/// blocks, if any.
fn parse_attribute_element(elem: &str) -> Result<(String, bool, Option<String>, Option<String>)> {
    let elem = elem.trim();
    let split_at = elem.find(char::is_whitespace).unwrap_or(elem.len());
    let name_token = elem[..split_at].trim();
    let rest = elem[split_at..].trim();

    let indexed = name_token.ends_with('*');
    let name = name_token.trim_end_matches('*').to_string();
    let (read_src, write_src) = if rest.is_empty() { (None, None) } else { parse_transformer_blocks(rest)? };
    Ok((name, indexed, read_src, write_src))
}

/// Splits `"TargetClass"` or `"TargetClass(k)"` into the target class name
/// and an optional integer cardinality.
fn parse_reference_target(spec: &str) -> Result<(String, Option<i64>)> {
    let spec = spec.trim();
    if let Some(open) = spec.find('(') {
        if !spec.ends_with(')') {
            return Err(Error::SyntaxError { fragment: spec.to_string(), reason: "unbalanced cardinality parentheses".to_string() });
        }
        let name = spec[..open].trim().to_string();
        let cardinality: i64 = spec[open + 1..spec.len() - 1]
            .trim()
            .parse()
            .map_err(|_| Error::SyntaxError { fragment: spec.to_string(), reason: "invalid cardinality".to_string() })?;
        Ok((name, Some(cardinality)))
    } else {
        Ok((spec.to_string(), None))
    }
}

/// Parses `"~ref_name -> TargetClass"` or `"~ref_name -> TargetClass(k)"`.
fn parse_reference_element(elem: &str) -> Result<(String, String, Option<i64>)> {
    let elem = elem.trim();
    let body = elem.strip_prefix('~').ok_or_else(|| Error::SyntaxError {
        fragment: elem.to_string(),
        reason: "reference element must start with '~'".to_string(),
    })?;
    let mut parts = body.splitn(2, "->");
    let name = parts.next().unwrap_or_default().trim().to_string();
    let target_spec = parts
        .next()
        .ok_or_else(|| Error::SyntaxError { fragment: elem.to_string(), reason: "missing target class in a reference".to_string() })?
        .trim();
    let (target_name, cardinality) = parse_reference_target(target_spec)?;
    Ok((name, target_name, cardinality))
}

/// Parses a class indicator: `"ClassName"`, `"ClassName(ParentName)"`, or
/// either with a trailing `*` marking the class as traced.
fn parse_class_indicator(indicator: &str) -> Result<(String, Option<String>, bool)> {
    let mut body = indicator.trim();
    let traced = body.ends_with('*');
    if traced {
        body = body[..body.len() - 1].trim();
    }

    if let Some(open) = body.find('(') {
        if !body.ends_with(')') {
            return Err(Error::SyntaxError { fragment: indicator.to_string(), reason: "unbalanced parent parentheses".to_string() });
        }
        let name = body[..open].trim().to_string();
        let parent = body[open + 1..body.len() - 1].trim().to_string();
        Ok((name, Some(parent), traced))
    } else {
        Ok((body.to_string(), None, traced))
    }
}

fn to_syntax_error(fragment: &str, err: Error) -> Error {
    match err {
        Error::SyntaxError { .. } => err,
        other => Error::SyntaxError { fragment: fragment.to_string(), reason: other.to_string() },
    }
}

/// Runs a DDL program against `schema`, in source order, applying every
/// block's declarations as it goes — a later block may reference a class,
/// attribute, datatype, or reference declared by an earlier one.
pub fn run(schema: &SchemaManager<'_>, text: &str) -> Result<()> {
    for (indicator, content) in split_blocks(text)? {
        let normalized: String = indicator.to_lowercase().split_whitespace().collect();
        if normalized == "+attributes" {
            run_attribute_block(schema, &content)?;
        } else if indicator.trim_start().starts_with('#') {
            run_datatype_block(schema, &indicator, &content)?;
        } else {
            run_class_block(schema, &indicator, &content)?;
        }
    }
    Ok(())
}

fn run_attribute_block(schema: &SchemaManager<'_>, content: &str) -> Result<()> {
    for elem in split_top_level(content) {
        let mut parts = elem.splitn(2, ':');
        let name = parts.next().unwrap_or_default().trim();
        let datatype_name = parts
            .next()
            .ok_or_else(|| Error::SyntaxError { fragment: elem.clone(), reason: "expected 'name:datatype'".to_string() })?
            .trim();
        let datatype = schema.get_datatype(datatype_name).map_err(|e| to_syntax_error(&elem, e))?;
        schema.create_attribute(name, &datatype).map_err(|e| to_syntax_error(&elem, e))?;
    }
    Ok(())
}

fn run_datatype_block(schema: &SchemaManager<'_>, indicator: &str, content: &str) -> Result<()> {
    let name = indicator.trim().trim_start_matches('#').trim().to_string();

    let (head, rest) = match first_top_level_comma(content) {
        Some(idx) => (content[..idx].trim(), content[idx + 1..].trim()),
        None => (content.trim(), ""),
    };
    if head.is_empty() {
        return Err(Error::SyntaxError { fragment: indicator.to_string(), reason: "missing generator or parent in datatype block".to_string() });
    }

    let (generator, parent) = if let Some(parent_name) = head.strip_prefix('#') {
        let parent = schema.get_datatype(parent_name.trim()).map_err(|e| to_syntax_error(indicator, e))?;
        (None, Some(parent))
    } else {
        (Some(head.to_string()), None)
    };

    let (read_src, write_src) = parse_transformer_blocks(rest)?;
    schema
        .create_datatype(&name, read_src, write_src, generator, parent.as_ref())
        .map_err(|e| to_syntax_error(indicator, e))?;
    Ok(())
}

fn run_class_block(schema: &SchemaManager<'_>, indicator: &str, content: &str) -> Result<()> {
    let (name, parent_name, traced) = parse_class_indicator(indicator)?;
    let parent = match parent_name {
        Some(p) => Some(schema.get_class(p.as_str()).map_err(|e| to_syntax_error(indicator, e))?),
        None => None,
    };
    let class = schema.create_class(&name, parent.as_ref(), traced).map_err(|e| to_syntax_error(indicator, e))?;

    for elem in split_top_level(content) {
        if elem.starts_with('~') {
            let (ref_name, target_name, cardinality) = parse_reference_element(&elem)?;
            let target = schema.get_class(target_name.as_str()).map_err(|e| to_syntax_error(&elem, e))?;
            schema.create_reference(&ref_name, &class, &target, cardinality).map_err(|e| to_syntax_error(&elem, e))?;
        } else {
            let (attr_name, indexed, read_src, write_src) = parse_attribute_element(&elem)?;
            let attribute = schema.get_attribute(attr_name.as_str()).map_err(|e| to_syntax_error(&elem, e))?;
            schema.assign(&class, &attribute, indexed, read_src, write_src).map_err(|e| to_syntax_error(&elem, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::inheritance::InheritanceEngine;
    use crate::registry::Registry;
    use crate::schema::{Attribute, Class, Datatype, Reference};

    fn fresh_schema() -> (crate::db::adapter::Adapter, Registry<Datatype>, Registry<Class>, Registry<Attribute>, Registry<Reference>, InheritanceEngine) {
        (db::open_in_memory().unwrap(), Registry::new(), Registry::new(), Registry::new(), Registry::new(), InheritanceEngine::new())
    }

    const EXAMPLE: &str = "
#int { INTEGER }
#money { #int, get { value = create_decimal(value, 2) }
                set { value = get_decimal_base_value(value, 2) } }
+attributes { first_name:text, birthday:date, salary:money }
Person { first_name, birthday*, ~lives_at -> Address(1) }
Employee(Person) { salary, ~manages -> Employee }
";

    #[test]
    fn parses_the_full_reference_example() {
        let (adapter, dt, c, a, r, inh) = fresh_schema();
        let schema = SchemaManager { adapter: &adapter, datatypes: &dt, classes: &c, attributes: &a, references: &r, inheritance: &inh };

        schema.create_datatype("text", None, None, Some("TEXT".into()), None).unwrap();
        schema.create_datatype("date", None, None, Some("TEXT".into()), None).unwrap();
        schema.create_class("Address", None, false).unwrap();

        run(&schema, EXAMPLE).unwrap();

        let int_dt = schema.get_datatype("int").unwrap();
        assert!(int_dt.is_root());
        let money_dt = schema.get_datatype("money").unwrap();
        assert_eq!(money_dt.parent_id, Some(int_dt.id));
        assert!(money_dt.read_transformer_source.is_some());
        assert!(money_dt.write_transformer_source.is_some());

        let person = schema.get_class("Person").unwrap();
        let employee = schema.get_class("Employee").unwrap();
        assert_eq!(employee.parent_id, Some(person.id));

        let salary = schema.get_attribute("salary").unwrap();
        let (owner, assignment) = schema.assignment_for(&employee, salary.id).unwrap().unwrap();
        assert_eq!(owner.name, "Employee");
        assert!(!assignment.indexed);

        let birthday = schema.get_attribute("birthday").unwrap();
        let (_, assignment) = schema.assignment_for(&person, birthday.id).unwrap().unwrap();
        assert!(assignment.indexed);

        schema.get_reference("lives_at").unwrap();
        schema.get_reference("manages").unwrap();
    }

    #[test]
    fn unbalanced_braces_raise_syntax_error() {
        let (adapter, dt, c, a, r, inh) = fresh_schema();
        let schema = SchemaManager { adapter: &adapter, datatypes: &dt, classes: &c, attributes: &a, references: &r, inheritance: &inh };

        let err = run(&schema, "Person { first_name").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { .. }));
    }

    #[test]
    fn missing_generator_or_parent_raises_syntax_error() {
        let (adapter, dt, c, a, r, inh) = fresh_schema();
        let schema = SchemaManager { adapter: &adapter, datatypes: &dt, classes: &c, attributes: &a, references: &r, inheritance: &inh };

        let err = run(&schema, "#broken {  }").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { .. }));
    }

    #[test]
    fn unknown_datatype_reference_raises_syntax_error() {
        let (adapter, dt, c, a, r, inh) = fresh_schema();
        let schema = SchemaManager { adapter: &adapter, datatypes: &dt, classes: &c, attributes: &a, references: &r, inheritance: &inh };

        let err = run(&schema, "+attributes { name:nonexistent }").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { .. }));
    }

    #[test]
    fn missing_reference_target_raises_syntax_error() {
        let (adapter, dt, c, a, r, inh) = fresh_schema();
        let schema = SchemaManager { adapter: &adapter, datatypes: &dt, classes: &c, attributes: &a, references: &r, inheritance: &inh };

        schema.create_class("Person", None, false).unwrap();
        let err = run(&schema, "Person { ~lives_at }").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { .. }));
    }
}
