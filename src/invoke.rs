//! Pre-resolved invocation handles and the positional argument binding they consume.
//!
//! Every tagged method gets one `InvokeFn`, generated next to the method by
//! `#[controller]`. The handle downcasts the type-erased handler instance, pulls its
//! arguments out of `Args` by position and normalizes the return value through
//! `IntoOutcome`. Nothing here looks anything up by name at request time.
use std::{any::Any, future::Future, pin::Pin};

use anyhow::anyhow;

use crate::{
    error::BindingError,
    request::{Request, RequestContext},
    view::View,
};

pub type Outcome = anyhow::Result<Option<View>>;

pub type InvokeFuture<'a> = Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;

pub type InvokeFn = for<'a> fn(
    target: &'a mut (dyn Any + Send),
    ctx: &'a mut RequestContext,
    args: Args,
) -> InvokeFuture<'a>;

/// Type-erased handler instance, as produced by an instance provider.
pub type Instance = Box<dyn Any + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Str,
    Int,
    UInt,
    Float,
    Bool,
}

impl ParamKind {
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Str => "string",
            ParamKind::Int => "integer",
            ParamKind::UInt => "unsigned integer",
            ParamKind::Float => "number",
            ParamKind::Bool => "boolean",
        }
    }

    fn parse(self, raw: &str) -> Option<ParamValue> {
        let raw_t = raw.trim();
        match self {
            ParamKind::Str => Some(ParamValue::Str(raw.to_string())),
            ParamKind::Int => raw_t.parse().ok().map(ParamValue::Int),
            ParamKind::UInt => raw_t.parse().ok().map(ParamValue::UInt),
            ParamKind::Float => raw_t.parse().ok().map(ParamValue::Float),
            ParamKind::Bool => match raw_t {
                "true" | "on" | "1" | "yes" => Some(ParamValue::Bool(true)),
                "false" | "off" | "0" | "no" => Some(ParamValue::Bool(false)),
                _ => None,
            },
        }
    }
}

/// One entry of a method's parameter shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn of<T: FromParam>(name: &'static str) -> Self {
        Self {
            name,
            kind: T::KIND,
            required: T::REQUIRED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Absent,
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

/// Types a handler method can declare as a request-bound parameter.
pub trait FromParam: Sized {
    const KIND: ParamKind;
    const REQUIRED: bool = true;
    fn from_value(v: ParamValue) -> Option<Self>;
}

impl FromParam for String {
    const KIND: ParamKind = ParamKind::Str;
    fn from_value(v: ParamValue) -> Option<Self> {
        match v {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FromParam for i64 {
    const KIND: ParamKind = ParamKind::Int;
    fn from_value(v: ParamValue) -> Option<Self> {
        match v {
            ParamValue::Int(n) => Some(n),
            _ => None,
        }
    }
}

impl FromParam for i32 {
    const KIND: ParamKind = ParamKind::Int;
    fn from_value(v: ParamValue) -> Option<Self> {
        i64::from_value(v).and_then(|n| i32::try_from(n).ok())
    }
}

impl FromParam for u64 {
    const KIND: ParamKind = ParamKind::UInt;
    fn from_value(v: ParamValue) -> Option<Self> {
        match v {
            ParamValue::UInt(n) => Some(n),
            _ => None,
        }
    }
}

impl FromParam for u32 {
    const KIND: ParamKind = ParamKind::UInt;
    fn from_value(v: ParamValue) -> Option<Self> {
        u64::from_value(v).and_then(|n| u32::try_from(n).ok())
    }
}

impl FromParam for f64 {
    const KIND: ParamKind = ParamKind::Float;
    fn from_value(v: ParamValue) -> Option<Self> {
        match v {
            ParamValue::Float(n) => Some(n),
            _ => None,
        }
    }
}

impl FromParam for bool {
    const KIND: ParamKind = ParamKind::Bool;
    fn from_value(v: ParamValue) -> Option<Self> {
        match v {
            ParamValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl<T: FromParam> FromParam for Option<T> {
    const KIND: ParamKind = T::KIND;
    const REQUIRED: bool = false;
    fn from_value(v: ParamValue) -> Option<Self> {
        match v {
            ParamValue::Absent => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Positional arguments bound against a parameter shape.
#[derive(Debug, Default)]
pub struct Args {
    values: Vec<ParamValue>,
}

impl Args {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Takes argument `idx`. Binding already validated the shape, so a mismatch
    /// here means the handle and the shape disagree.
    pub fn take<T: FromParam>(&mut self, idx: usize) -> anyhow::Result<T> {
        let v = self
            .values
            .get_mut(idx)
            .map(|slot| std::mem::replace(slot, ParamValue::Absent))
            .ok_or_else(|| anyhow!("argument {idx} out of range"))?;
        T::from_value(v).ok_or_else(|| anyhow!("argument {idx} does not match its declared kind"))
    }
}

impl FromIterator<ParamValue> for Args {
    fn from_iter<I: IntoIterator<Item = ParamValue>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Binds request parameters by name, in declared order, into positional `Args`.
pub fn bind(shape: &[ParamSpec], request: &Request) -> Result<Args, BindingError> {
    shape
        .iter()
        .map(|spec| match request.get_param(spec.name) {
            None if spec.required => Err(BindingError::Missing { param: spec.name }),
            None => Ok(ParamValue::Absent),
            Some(raw) => spec.kind.parse(raw).ok_or_else(|| BindingError::Invalid {
                param: spec.name,
                expected: spec.kind.name(),
                value: raw.to_string(),
            }),
        })
        .collect()
}

/// Normalizes what a handler method returns.
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Outcome {
        Ok(None)
    }
}

impl IntoOutcome for View {
    fn into_outcome(self) -> Outcome {
        Ok(Some(self))
    }
}

impl IntoOutcome for Option<View> {
    fn into_outcome(self) -> Outcome {
        Ok(self)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<anyhow::Error>,
{
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(v) => v.into_outcome(),
            Err(e) => Err(e.into()),
        }
    }
}

#[doc(hidden)]
pub fn __downcast<T: Any>(target: &mut (dyn Any + Send)) -> anyhow::Result<&mut T> {
    target
        .downcast_mut::<T>()
        .ok_or_else(|| anyhow!("handler instance is not a {}", std::any::type_name::<T>()))
}
