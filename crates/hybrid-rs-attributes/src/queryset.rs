//! Filtering querysets with hybrid filters and ordinary criteria together.
//!
//! [`HybridQuerySetExt::hybrid_filter`] accepts a mix of [`Q`] objects and
//! [`HybridFilter`]s in any order. Ordinary criteria are applied first
//! through `QuerySet::filter`, then each hybrid filter is applied in the
//! order given. There is no hybrid `exclude`: negate the expression before
//! comparing instead.
//!
//! ```
//! use hybrid_rs_attributes::{FilterArg, HybridExpression, HybridQuerySetExt};
//! use hybrid_rs_db::{Expression, Q};
//! # use hybrid_rs_db::{FieldDef, FieldType, Model, ModelMeta, Row, Value};
//! # use hybrid_rs_core::HybridError;
//! # use std::sync::LazyLock;
//! # struct Item;
//! # impl Model for Item {
//! #     fn meta() -> &'static ModelMeta {
//! #         static META: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta::new("shop", "item", vec![
//! #             FieldDef::new("id", FieldType::BigAutoField).primary_key(),
//! #             FieldDef::new("price", FieldType::IntegerField),
//! #         ]));
//! #         &META
//! #     }
//! #     fn pk(&self) -> Option<&Value> { None }
//! #     fn field_values(&self) -> Vec<(&'static str, Value)> { Vec::new() }
//! #     fn from_row(_: &Row) -> Result<Self, HybridError> { Ok(Self) }
//! # }
//!
//! let doubled = HybridExpression::new("doubled", |through: &str| {
//!     Expression::f(format!("{through}price")) * Expression::value(2)
//! });
//! let qs = Item::objects()
//!     .all()
//!     .hybrid_filter([
//!         FilterArg::from(Q::kwarg("price__gt", 1)),
//!         FilterArg::from(doubled.lt(100)),
//!     ])
//!     .unwrap();
//! assert_eq!(qs.query().annotations.len(), 1);
//! ```

use crate::filter::HybridFilter;
use hybrid_rs_core::HybridResult;
use hybrid_rs_db::{Manager, Model, QuerySet, Value, Q};
use std::fmt;
use std::marker::PhantomData;

/// One positional argument to [`HybridQuerySetExt::hybrid_filter`].
#[derive(Debug)]
pub enum FilterArg {
    /// An ordinary filter criterion.
    Q(Q),
    /// A filter built from a hybrid expression comparison.
    Hybrid(HybridFilter),
}

impl From<Q> for FilterArg {
    fn from(q: Q) -> Self {
        Self::Q(q)
    }
}

impl From<HybridFilter> for FilterArg {
    fn from(filter: HybridFilter) -> Self {
        Self::Hybrid(filter)
    }
}

/// Hybrid-aware filtering for querysets.
pub trait HybridQuerySetExt: Sized {
    /// Filters by a mix of ordinary criteria and hybrid filters.
    ///
    /// # Errors
    ///
    /// Passes through query layer errors raised while applying a hybrid
    /// filter (an unknown lookup, for example).
    fn hybrid_filter<I>(self, args: I) -> HybridResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<FilterArg>,
    {
        self.hybrid_filter_with(args, &[])
    }

    /// Like [`hybrid_filter`](Self::hybrid_filter), with Django-style
    /// keyword criteria (`("first_name", "Ada".into())`) as well.
    ///
    /// # Errors
    ///
    /// Same as [`hybrid_filter`](Self::hybrid_filter).
    fn hybrid_filter_with<I>(self, args: I, kwargs: &[(&str, Value)]) -> HybridResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<FilterArg>;
}

impl<M: Model> HybridQuerySetExt for QuerySet<M> {
    fn hybrid_filter_with<I>(self, args: I, kwargs: &[(&str, Value)]) -> HybridResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<FilterArg>,
    {
        let mut common = Vec::new();
        let mut hybrids = Vec::new();
        for arg in args {
            match arg.into() {
                FilterArg::Q(q) => common.push(q),
                FilterArg::Hybrid(filter) => hybrids.push(filter),
            }
        }
        common.extend(kwargs.iter().map(|(key, value)| Q::kwarg(key, value.clone())));

        let mut qs = self;
        for q in common {
            qs = qs.filter(q);
        }
        for filter in hybrids {
            qs = filter.apply(qs)?;
        }
        Ok(qs)
    }
}

/// A manager whose `filter` understands hybrid filters.
pub struct HybridManager<M: Model> {
    _model: PhantomData<M>,
}

impl<M: Model> fmt::Debug for HybridManager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridManager")
            .field("model", &M::table_name())
            .finish()
    }
}

impl<M: Model> Default for HybridManager<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> HybridManager<M> {
    /// Creates a manager.
    pub const fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }

    /// A fresh queryset over all rows of `M`.
    pub fn get_queryset(&self) -> QuerySet<M> {
        Manager::<M>::new().all()
    }

    /// Same as [`get_queryset`](Self::get_queryset).
    pub fn all(&self) -> QuerySet<M> {
        self.get_queryset()
    }

    /// Filters a fresh queryset.
    ///
    /// # Errors
    ///
    /// Same as [`HybridQuerySetExt::hybrid_filter`].
    pub fn filter<I>(&self, args: I) -> HybridResult<QuerySet<M>>
    where
        I: IntoIterator,
        I::Item: Into<FilterArg>,
    {
        self.get_queryset().hybrid_filter(args)
    }

    /// Filters a fresh queryset with keyword criteria as well.
    ///
    /// # Errors
    ///
    /// Same as [`HybridQuerySetExt::hybrid_filter`].
    pub fn filter_with<I>(&self, args: I, kwargs: &[(&str, Value)]) -> HybridResult<QuerySet<M>>
    where
        I: IntoIterator,
        I::Item: Into<FilterArg>,
    {
        self.get_queryset().hybrid_filter_with(args, kwargs)
    }
}
