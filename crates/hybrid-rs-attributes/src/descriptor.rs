//! Hybrid properties and methods.
//!
//! A hybrid attribute pairs an instance-level body (plain Rust over a loaded
//! model) with a query-level expression body. Which one runs depends on the
//! [`Access`] context: on an instance the body is evaluated; on the model
//! type a fresh [`HybridExpression`] is returned for use in filters.
//!
//! The expression body must be registered explicitly with
//! [`HybridProperty::expression`] or [`HybridMethod::expression`]; it is
//! never derived from the instance body.
//!
//! ```
//! use hybrid_rs_attributes::{Access, HybridProperty, Resolved};
//! use hybrid_rs_db::query::expressions::functions::concat;
//! use hybrid_rs_db::Expression;
//!
//! struct Person { first: String, last: String }
//!
//! let full_name = HybridProperty::new("full_name", |p: &Person| format!("{} {}", p.first, p.last))
//!     .expression(|through: &str| {
//!         concat(vec![
//!             Expression::f(format!("{through}first")),
//!             Expression::value(" "),
//!             Expression::f(format!("{through}last")),
//!         ])
//!     });
//!
//! let ada = Person { first: "Ada".into(), last: "Lovelace".into() };
//! assert_eq!(full_name.value(&ada), "Ada Lovelace");
//! assert!(matches!(full_name.get(Access::Class).unwrap(), Resolved::Expression(_)));
//! ```

use crate::expression::{ExpressionProducer, HybridExpression};
use hybrid_rs_core::{HybridError, HybridResult};
use hybrid_rs_db::{Expression, Value};
use std::fmt;
use std::sync::Arc;

/// The context a hybrid attribute is accessed in.
#[derive(Debug)]
pub enum Access<'a, M> {
    /// Accessed on a loaded instance.
    Instance(&'a M),
    /// Accessed on the model type.
    Class,
}

impl<M> Clone for Access<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Access<'_, M> {}

/// What an access resolved to.
#[derive(Debug)]
pub enum Resolved<T> {
    /// The instance-level value.
    Value(T),
    /// A query-level expression.
    Expression(HybridExpression),
}

impl<T> Resolved<T> {
    /// Returns the instance-level value, if this is one.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Expression(_) => None,
        }
    }

    /// Returns the query-level expression, if this is one.
    pub fn into_expression(self) -> Option<HybridExpression> {
        match self {
            Self::Value(_) => None,
            Self::Expression(e) => Some(e),
        }
    }
}

fn not_registered(name: &str) -> HybridError {
    HybridError::ImproperlyConfigured(format!(
        "Hybrid attribute '{name}' has no expression registered; \
         register one with `.expression(...)` before using it in a query"
    ))
}

type Getter<M, T> = Box<dyn Fn(&M) -> T + Send + Sync>;
type Setter<M, T> = Box<dyn Fn(&mut M, T) + Send + Sync>;
type Deleter<M> = Box<dyn Fn(&mut M) + Send + Sync>;

/// A computed property usable on instances and in queries.
pub struct HybridProperty<M, T> {
    name: &'static str,
    getter: Getter<M, T>,
    expression: Option<ExpressionProducer>,
    setter: Option<Setter<M, T>>,
    deleter: Option<Deleter<M>>,
}

impl<M, T> fmt::Debug for HybridProperty<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridProperty")
            .field("name", &self.name)
            .field("has_expression", &self.expression.is_some())
            .field("has_setter", &self.setter.is_some())
            .field("has_deleter", &self.deleter.is_some())
            .finish()
    }
}

impl<M, T> HybridProperty<M, T> {
    /// Creates a property from its instance-level getter.
    pub fn new(name: &'static str, getter: impl Fn(&M) -> T + Send + Sync + 'static) -> Self {
        Self {
            name,
            getter: Box::new(getter),
            expression: None,
            setter: None,
            deleter: None,
        }
    }

    /// Registers (or replaces) the query-level expression body. The body
    /// receives the relation path prefix its field references must use.
    #[must_use]
    pub fn expression(mut self, body: impl Fn(&str) -> Expression + Send + Sync + 'static) -> Self {
        self.expression = Some(Arc::new(body));
        self
    }

    /// Registers a setter.
    #[must_use]
    pub fn with_setter(mut self, setter: impl Fn(&mut M, T) + Send + Sync + 'static) -> Self {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Registers a deleter.
    #[must_use]
    pub fn with_deleter(mut self, deleter: impl Fn(&mut M) + Send + Sync + 'static) -> Self {
        self.deleter = Some(Box::new(deleter));
        self
    }

    /// The attribute name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a query-level expression body is registered.
    pub const fn has_expression(&self) -> bool {
        self.expression.is_some()
    }

    /// Resolves the property in the given access context.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::ImproperlyConfigured`] for class access
    /// without a registered expression body.
    pub fn get(&self, access: Access<'_, M>) -> HybridResult<Resolved<T>> {
        match access {
            Access::Instance(instance) => Ok(Resolved::Value(self.value(instance))),
            Access::Class => self.expr().map(Resolved::Expression),
        }
    }

    /// Evaluates the getter on an instance.
    pub fn value(&self, instance: &M) -> T {
        (self.getter)(instance)
    }

    /// Returns a fresh query-level expression.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::ImproperlyConfigured`] if no expression body
    /// is registered.
    pub fn expr(&self) -> HybridResult<HybridExpression> {
        let producer = self.expression.as_ref().ok_or_else(|| not_registered(self.name))?;
        tracing::trace!(attribute = self.name, "hybrid property accessed at class level");
        Ok(HybridExpression::from_producer(self.name, Arc::clone(producer)))
    }

    /// Assigns through the registered setter.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::AttributeError`] without a setter.
    pub fn set(&self, instance: &mut M, value: T) -> HybridResult<()> {
        let setter = self
            .setter
            .as_ref()
            .ok_or_else(|| HybridError::AttributeError("can't set attribute".into()))?;
        setter(instance, value);
        Ok(())
    }

    /// Deletes through the registered deleter.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::AttributeError`] without a deleter.
    pub fn delete(&self, instance: &mut M) -> HybridResult<()> {
        let deleter = self
            .deleter
            .as_ref()
            .ok_or_else(|| HybridError::AttributeError("can't delete attribute".into()))?;
        deleter(instance);
        Ok(())
    }
}

type MethodBody<M, A, T> = Box<dyn Fn(&M, &A) -> T + Send + Sync>;
type MethodExpression<A> = Arc<dyn Fn(&str, &A) -> Expression + Send + Sync>;

/// A computed method usable on instances and in queries.
///
/// `A` is the argument type shared by both bodies; use a tuple for several
/// arguments and `()` for none.
pub struct HybridMethod<M, A, T> {
    name: &'static str,
    body: MethodBody<M, A, T>,
    expression: Option<MethodExpression<A>>,
}

impl<M, A, T> fmt::Debug for HybridMethod<M, A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridMethod")
            .field("name", &self.name)
            .field("has_expression", &self.expression.is_some())
            .finish()
    }
}

impl<M, A, T> HybridMethod<M, A, T>
where
    A: Clone + Send + Sync + 'static,
{
    /// Creates a method from its instance-level body.
    pub fn new(name: &'static str, body: impl Fn(&M, &A) -> T + Send + Sync + 'static) -> Self {
        Self {
            name,
            body: Box::new(body),
            expression: None,
        }
    }

    /// Registers (or replaces) the query-level expression body. The body
    /// receives the relation path prefix and the method arguments.
    #[must_use]
    pub fn expression(
        mut self,
        body: impl Fn(&str, &A) -> Expression + Send + Sync + 'static,
    ) -> Self {
        self.expression = Some(Arc::new(body));
        self
    }

    /// The attribute name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether a query-level expression body is registered.
    pub const fn has_expression(&self) -> bool {
        self.expression.is_some()
    }

    /// Calls the instance-level body.
    pub fn call(&self, instance: &M, args: A) -> T {
        (self.body)(instance, &args)
    }

    /// Returns the method bound to an instance.
    pub fn instance_accessor<'a>(&'a self, instance: &'a M) -> impl Fn(A) -> T + 'a {
        move |args| self.call(instance, args)
    }

    /// Returns a callable that builds a fresh query-level expression from
    /// the method arguments.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::ImproperlyConfigured`] if no expression body
    /// is registered.
    pub fn class_accessor(&self) -> HybridResult<impl Fn(A) -> HybridExpression> {
        let body = Arc::clone(self.expression.as_ref().ok_or_else(|| not_registered(self.name))?);
        let name = self.name;
        Ok(move |args: A| {
            tracing::trace!(attribute = name, "hybrid method accessed at class level");
            let body = Arc::clone(&body);
            HybridExpression::new(name, move |through: &str| body(through, &args))
        })
    }

    /// Builds a query-level expression for the given arguments.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::ImproperlyConfigured`] if no expression body
    /// is registered.
    pub fn expr(&self, args: A) -> HybridResult<HybridExpression> {
        Ok(self.class_accessor()?(args))
    }

    /// Resolves the method in the given access context with `args`.
    ///
    /// # Errors
    ///
    /// Same as [`expr`](Self::expr) for class access.
    pub fn get(&self, access: Access<'_, M>, args: A) -> HybridResult<Resolved<T>> {
        match access {
            Access::Instance(instance) => Ok(Resolved::Value(self.call(instance, args))),
            Access::Class => self.expr(args).map(Resolved::Expression),
        }
    }

    /// Fixes the arguments, producing an attribute the consistency checker
    /// can evaluate.
    pub fn bind(&self, args: A) -> BoundHybridMethod<'_, M, A, T> {
        BoundHybridMethod { method: self, args }
    }
}

/// A [`HybridMethod`] with its arguments fixed.
pub struct BoundHybridMethod<'a, M, A, T> {
    method: &'a HybridMethod<M, A, T>,
    args: A,
}

impl<M, A: fmt::Debug, T> fmt::Debug for BoundHybridMethod<'_, M, A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHybridMethod")
            .field("method", &self.method.name)
            .field("args", &self.args)
            .finish()
    }
}

/// A hybrid attribute reduced to what comparing both sides needs.
pub trait HybridAttribute<M>: Send + Sync {
    /// The attribute name.
    fn name(&self) -> &str;

    /// A fresh query-level expression.
    fn class_expression(&self) -> HybridResult<HybridExpression>;

    /// The instance-level value, as a database value.
    fn instance_value(&self, instance: &M) -> Value;
}

impl<M, T> HybridAttribute<M> for HybridProperty<M, T>
where
    T: Into<Value>,
{
    fn name(&self) -> &str {
        self.name
    }

    fn class_expression(&self) -> HybridResult<HybridExpression> {
        self.expr()
    }

    fn instance_value(&self, instance: &M) -> Value {
        self.value(instance).into()
    }
}

impl<M, A, T> HybridAttribute<M> for BoundHybridMethod<'_, M, A, T>
where
    A: Clone + Send + Sync + 'static,
    T: Into<Value>,
{
    fn name(&self) -> &str {
        self.method.name
    }

    fn class_expression(&self) -> HybridResult<HybridExpression> {
        self.method.expr(self.args.clone())
    }

    fn instance_value(&self, instance: &M) -> Value {
        self.method.call(instance, self.args.clone()).into()
    }
}
