// src/transform/mod.rs

//! The Transformer Host: compiles a textual transformer body into a cached
//! Lua callable, evaluated under a restricted environment table that only
//! exposes the fixed set of globals §4.3 allows. Nothing above this module
//! ever sees an `mlua` type directly — `invoke_datatype`/`invoke_assignment`
//! take and return [`crate::value::Value`].
//!
//! A thrown Lua error, or a failure to compile, is logged and turned into
//! `Value::Null` here — this is the one place `TransformError` is recovered
//! rather than propagated (§7).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use mlua::{Function, Lua, Table, Value as LuaValue};
use tracing::warn;

use crate::value::{self, Value};

/// A snapshot of an object, shaped for the `this` parameter of an assignment
/// transformer and the return value of the `get_object` global. Carries
/// just enough to be useful inside a transformer body without exposing the
/// whole Object Engine to untrusted script source.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub id: i64,
    pub class_name: String,
    pub status: i64,
    pub attributes: Vec<(String, Value)>,
}

/// Read-only lookups the transformer host's allowed globals are permitted
/// to perform. Implemented by `store::Store` and reached through a weak
/// handle so the host (owned by the store) never keeps the store alive.
pub trait TransformLookup {
    fn lookup_class(&self, name: &str) -> Option<(i64, String)>;
    fn lookup_attribute(&self, name: &str) -> Option<(i64, String)>;
    fn lookup_reference(&self, name: &str) -> Option<(i64, String)>;
    fn lookup_object(&self, id: i64) -> Option<ObjectSummary>;
}

type LookupCell = Rc<RefCell<Option<Weak<dyn TransformLookup>>>>;

/// Lua newtype wrappers so decimal/date/datetime values survive a trip
/// through the transformer host without losing their shape to a plain
/// string or float.
#[derive(Clone)]
struct LuaDecimal(bigdecimal::BigDecimal);
impl mlua::UserData for LuaDecimal {}

#[derive(Clone)]
struct LuaDate(chrono::NaiveDate);
impl mlua::UserData for LuaDate {}

#[derive(Clone)]
struct LuaDateTime(chrono::NaiveDateTime);
impl mlua::UserData for LuaDateTime {}

fn rt_err(msg: impl std::fmt::Display) -> mlua::Error {
    mlua::Error::RuntimeError(msg.to_string())
}

fn value_to_lua(lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
    Ok(match value {
        Value::Null => LuaValue::Nil,
        Value::Integer(i) => LuaValue::Integer(*i),
        Value::Real(f) => LuaValue::Number(*f),
        Value::Text(s) => LuaValue::String(lua.create_string(s)?),
        Value::Blob(b) => LuaValue::String(lua.create_string(b)?),
        Value::Decimal(d) => LuaValue::UserData(lua.create_userdata(LuaDecimal(d.clone()))?),
        Value::Date(d) => LuaValue::UserData(lua.create_userdata(LuaDate(*d))?),
        Value::DateTime(dt) => LuaValue::UserData(lua.create_userdata(LuaDateTime(*dt))?),
    })
}

fn lua_to_value(value: LuaValue) -> Value {
    match value {
        LuaValue::Nil => Value::Null,
        LuaValue::Boolean(b) => Value::Integer(b as i64),
        LuaValue::Integer(i) => Value::Integer(i),
        LuaValue::Number(f) => Value::Real(f),
        LuaValue::String(s) => {
            let bytes = s.as_bytes().to_vec();
            match String::from_utf8(bytes.clone()) {
                Ok(text) => Value::Text(text),
                Err(_) => Value::Blob(bytes),
            }
        }
        LuaValue::UserData(ud) => {
            if let Ok(d) = ud.borrow::<LuaDecimal>() {
                Value::Decimal(d.0.clone())
            } else if let Ok(d) = ud.borrow::<LuaDate>() {
                Value::Date(d.0)
            } else if let Ok(d) = ud.borrow::<LuaDateTime>() {
                Value::DateTime(d.0)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}

fn object_summary_table(lua: &Lua, summary: &ObjectSummary) -> mlua::Result<Table> {
    let t = lua.create_table()?;
    t.set("id", summary.id)?;
    t.set("class_name", summary.class_name.clone())?;
    t.set("status", summary.status)?;
    let attrs = lua.create_table()?;
    for (name, value) in &summary.attributes {
        attrs.set(name.clone(), value_to_lua(lua, value)?)?;
    }
    t.set("attributes", attrs)?;
    Ok(t)
}

/// Strips the indentation common to every non-empty line, per §4.3's
/// "input normalisation" rule.
fn strip_common_indent(source: &str) -> String {
    let common = source
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    source
        .lines()
        .map(|l| if l.len() >= common { &l[common..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Host {
    lua: Lua,
    env: Table,
    cache: RefCell<HashMap<String, Function>>,
    lookup: LookupCell,
}

impl Host {
    pub fn new() -> crate::error::Result<Self> {
        let lua = Lua::new();
        let lookup: LookupCell = Rc::new(RefCell::new(None));
        let env = lua.create_table().map_err(lua_setup_err)?;

        macro_rules! set_lookup_fn {
            ($name:literal, $method:ident) => {{
                let cell = lookup.clone();
                let f = lua
                    .create_function(move |lua, key: LuaValue| -> mlua::Result<LuaValue> {
                        let name = match &key {
                            LuaValue::String(s) => s.to_str().map(|s| s.to_string()).unwrap_or_default(),
                            LuaValue::Integer(i) => i.to_string(),
                            _ => return Ok(LuaValue::Nil),
                        };
                        let host = cell.borrow().as_ref().and_then(|w| w.upgrade());
                        match host.and_then(|h| h.$method(&name)) {
                            Some((id, name)) => {
                                let t = lua.create_table()?;
                                t.set("id", id)?;
                                t.set("name", name)?;
                                Ok(LuaValue::Table(t))
                            }
                            None => Ok(LuaValue::Nil),
                        }
                    })
                    .map_err(lua_setup_err)?;
                env.set($name, f).map_err(lua_setup_err)?;
            }};
        }
        set_lookup_fn!("get_class", lookup_class);
        set_lookup_fn!("get_attribute", lookup_attribute);
        set_lookup_fn!("get_reference", lookup_reference);

        let cell = lookup.clone();
        let get_object = lua
            .create_function(move |lua, id: i64| -> mlua::Result<LuaValue> {
                let host = cell.borrow().as_ref().and_then(|w| w.upgrade());
                match host.and_then(|h| h.lookup_object(id)) {
                    Some(summary) => Ok(LuaValue::Table(object_summary_table(lua, &summary)?)),
                    None => Ok(LuaValue::Nil),
                }
            })
            .map_err(lua_setup_err)?;
        env.set("get_object", get_object).map_err(lua_setup_err)?;

        env.set(
            "parse_date",
            lua.create_function(|_, s: String| {
                value::parse_date(&s).map(LuaDate).map_err(rt_err)
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "format_date",
            lua.create_function(|_, ud: mlua::AnyUserData| {
                Ok(value::format_date(&ud.borrow::<LuaDate>()?.0))
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "parse_datetime",
            lua.create_function(|_, s: String| {
                value::parse_datetime(&s).map(LuaDateTime).map_err(rt_err)
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "format_datetime",
            lua.create_function(|_, ud: mlua::AnyUserData| {
                Ok(value::format_datetime(&ud.borrow::<LuaDateTime>()?.0))
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "decimal_from_units",
            lua.create_function(|_, (units, digits): (i64, u32)| {
                Ok(LuaDecimal(value::decimal_from_units(units, digits)))
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "decimal_to_units",
            lua.create_function(|_, (ud, digits): (mlua::AnyUserData, u32)| {
                value::decimal_to_units(&ud.borrow::<LuaDecimal>()?.0, digits).map_err(rt_err)
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "array_to_bytes",
            lua.create_function(|lua, table: Table| {
                let values: Vec<f64> = table.sequence_values().collect::<mlua::Result<_>>()?;
                let bytes = serde_json::to_vec(&values).map_err(rt_err)?;
                lua.create_string(&bytes)
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "bytes_to_array",
            lua.create_function(|lua, bytes: mlua::String| {
                let values: Vec<f64> = serde_json::from_slice(&bytes.as_bytes()).map_err(rt_err)?;
                let t = lua.create_table()?;
                for (i, v) in values.into_iter().enumerate() {
                    t.set(i + 1, v)?;
                }
                Ok(t)
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "compress",
            lua.create_function(|lua, bytes: mlua::String| {
                use std::io::Write;
                let mut encoder =
                    flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&bytes.as_bytes()).map_err(rt_err)?;
                let out = encoder.finish().map_err(rt_err)?;
                lua.create_string(&out)
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        env.set(
            "decompress",
            lua.create_function(|lua, bytes: mlua::String| {
                use std::io::Read;
                let mut decoder = flate2::read::ZlibDecoder::new(&bytes.as_bytes()[..]);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out).map_err(rt_err)?;
                lua.create_string(&out)
            })
            .map_err(lua_setup_err)?,
        )
        .map_err(lua_setup_err)?;

        Ok(Self { lua, env, cache: RefCell::new(HashMap::new()), lookup })
    }

    /// Binds the host to the store it belongs to. Called once, right after
    /// the store's owning `Rc` is constructed, so the allowed globals can
    /// resolve `get_class`/`get_attribute`/`get_reference`/`get_object`.
    pub fn bind(&self, lookup: Weak<dyn TransformLookup>) {
        *self.lookup.borrow_mut() = Some(lookup);
    }

    fn compile(&self, source: &str, params: &[&str]) -> crate::error::Result<Function> {
        let cache_key = format!("{}\u{0}{}", params.join(","), source);
        if let Some(cached) = self.cache.borrow().get(&cache_key) {
            return Ok(cached.clone());
        }

        let body = strip_common_indent(source);
        let indented: String = body.lines().map(|l| format!("  {l}\n")).collect();
        let wrapped = format!("return function({})\n{}end", params.join(", "), indented);

        let func: Function = self
            .lua
            .load(&wrapped)
            .set_name("transformer")
            .set_environment(self.env.clone())
            .eval()
            .map_err(|e| crate::error::Error::TransformError(format!("compile failed: {e}")))?;

        self.cache.borrow_mut().insert(cache_key, func.clone());
        Ok(func)
    }

    /// Invokes a datatype-level transformer: identity if `source` is absent,
    /// otherwise the single-parameter `f(value)` form.
    pub fn invoke_datatype(&self, source: Option<&str>, value: Value) -> Value {
        let Some(source) = source else { return value };
        self.run(source, &["value"], |f| {
            let lua_value = value_to_lua(&self.lua, &value)?;
            f.call::<_, LuaValue>(lua_value)
        })
    }

    /// Invokes an assignment-level transformer: identity if `source` is
    /// absent, otherwise the two-parameter `f(value, this)` form.
    pub fn invoke_assignment(
        &self,
        source: Option<&str>,
        value: Value,
        this: Option<&ObjectSummary>,
    ) -> Value {
        let Some(source) = source else { return value };
        self.run(source, &["value", "this"], |f| {
            let lua_value = value_to_lua(&self.lua, &value)?;
            let lua_this = match this {
                Some(summary) => LuaValue::Table(object_summary_table(&self.lua, summary)?),
                None => LuaValue::Nil,
            };
            f.call::<_, LuaValue>((lua_value, lua_this))
        })
    }

    fn run(
        &self,
        source: &str,
        params: &[&str],
        call: impl FnOnce(&Function) -> mlua::Result<LuaValue>,
    ) -> Value {
        match self.compile(source, params) {
            Ok(f) => match call(&f) {
                Ok(result) => lua_to_value(result),
                Err(e) => {
                    warn!(error = %e, "transformer raised; returning null");
                    Value::Null
                }
            },
            Err(e) => {
                warn!(error = %e, "transformer failed to compile; returning null");
                Value::Null
            }
        }
    }
}

fn lua_setup_err(e: mlua::Error) -> crate::error::Error {
    crate::error::Error::TransformError(format!("failed to set up transformer host: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoLookup;
    impl TransformLookup for NoLookup {
        fn lookup_class(&self, _: &str) -> Option<(i64, String)> {
            None
        }
        fn lookup_attribute(&self, _: &str) -> Option<(i64, String)> {
            None
        }
        fn lookup_reference(&self, _: &str) -> Option<(i64, String)> {
            None
        }
        fn lookup_object(&self, _: i64) -> Option<ObjectSummary> {
            None
        }
    }

    #[test]
    fn identity_when_source_absent() {
        let host = Host::new().unwrap();
        let v = host.invoke_datatype(None, Value::Integer(7));
        assert_eq!(v, Value::Integer(7));
    }

    #[test]
    fn datatype_transform_runs_source() {
        let host = Host::new().unwrap();
        let v = host.invoke_datatype(Some("return value * 2"), Value::Integer(21));
        assert_eq!(v, Value::Integer(42));
    }

    #[test]
    fn decimal_roundtrip_through_lua() {
        let host = Host::new().unwrap();
        let read = host.invoke_datatype(Some("return decimal_from_units(value, 2)"), Value::Integer(123));
        match read {
            Value::Decimal(d) => assert_eq!(d.to_string(), "1.23"),
            other => panic!("expected decimal, got {other:?}"),
        }
    }

    #[test]
    fn thrown_error_is_recovered_as_null() {
        let host = Host::new().unwrap();
        let v = host.invoke_datatype(Some("error('boom')"), Value::Integer(1));
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn assignment_transform_sees_this() {
        let host = Host::new().unwrap();
        let this = ObjectSummary {
            id: 5,
            class_name: "Person".to_string(),
            status: 1,
            attributes: vec![],
        };
        let v = host.invoke_assignment(
            Some("return value .. '-' .. this.class_name"),
            Value::Text("x".to_string()),
            Some(&this),
        );
        assert_eq!(v, Value::Text("x-Person".to_string()));
    }

    #[allow(dead_code)]
    fn type_check_lookup_is_object_safe(_: &dyn TransformLookup) {}
    #[allow(dead_code)]
    fn unused() {
        let _: Box<dyn TransformLookup> = Box::new(NoLookup);
    }
}
