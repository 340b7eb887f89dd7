//! SQL query AST and compiler.
//!
//! This module defines the [`Query`] AST that represents a database query, and
//! the [`SqlCompiler`] that translates it into parameterized SQL strings. The
//! compiler supports PostgreSQL (`$1, $2, ...`) and SQLite/MySQL (`?`) parameter
//! placeholder styles.
//!
//! Two things happen during compilation that the AST itself does not spell
//! out. Field paths such as `classroom__teacher__first_name` are resolved
//! through the model's foreign keys (forward, or backward through a
//! declared reverse relation) into joins, and references to an
//! annotation alias (in a filter, an `F`, or an ordering) are replaced by the
//! annotation's own expression so that filtering on an annotation works on
//! every backend.

use super::expressions::Expression;
use super::lookups::{Lookup, Q};
use crate::model::ModelMeta;
use crate::value::Value;
use hybrid_rs_core::{HybridError, HybridResult};

/// Separator between relation hops and lookups in a field path.
pub const LOOKUP_SEP: &str = "__";

/// The type of database backend, used by the compiler to generate
/// backend-specific SQL syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackendType {
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    PostgreSQL,
    /// SQLite (uses `?` placeholders).
    SQLite,
    /// MySQL (uses `?` placeholders).
    MySQL,
}

/// A column ordering direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// The field path or annotation alias to order by.
    pub column: String,
    /// Whether to sort in descending order.
    pub descending: bool,
}

impl OrderBy {
    /// Creates an ascending order.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Creates a descending order.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    /// Parses Django's `"-field"` notation.
    pub fn parse(spec: &str) -> Self {
        spec.strip_prefix('-').map_or_else(|| Self::asc(spec), Self::desc)
    }
}

/// A column to select in a query.
#[derive(Debug, Clone)]
pub enum SelectColumn {
    /// A field path.
    Column(String),
    /// An expression with an alias.
    Expression(Expression, String),
    /// All columns of the base table.
    Star,
}

/// A WHERE clause node in the query AST.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereNode {
    /// A single condition.
    Condition {
        /// The field path or annotation alias.
        column: String,
        /// The lookup type.
        lookup: Lookup,
    },
    /// Logical AND of conditions.
    And(Vec<WhereNode>),
    /// Logical OR of conditions.
    Or(Vec<WhereNode>),
    /// Logical NOT of a condition.
    Not(Box<WhereNode>),
}

impl WhereNode {
    /// Converts a `Q` object into a `WhereNode`.
    pub fn from_q(q: &Q) -> Self {
        match q {
            Q::Filter { field, lookup } => Self::Condition {
                column: field.clone(),
                lookup: lookup.clone(),
            },
            Q::And(children) => Self::And(children.iter().map(Self::from_q).collect()),
            Q::Or(children) => Self::Or(children.iter().map(Self::from_q).collect()),
            Q::Not(inner) => Self::Not(Box::new(Self::from_q(inner))),
        }
    }

    /// ANDs `other` onto this node, flattening nested ANDs.
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut children) => {
                children.push(other);
                Self::And(children)
            }
            node => Self::And(vec![node, other]),
        }
    }
}

/// A JOIN produced while resolving a relation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// The table to join.
    pub table: String,
    /// The alias, equal to the relation path that produced it.
    pub alias: String,
    /// The type of join.
    pub join_type: JoinType,
    /// Left side of the ON equality, already quoted.
    pub left: String,
    /// Right side of the ON equality, already quoted.
    pub right: String,
}

/// SQL JOIN types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN, for non-nullable foreign keys.
    Inner,
    /// LEFT OUTER JOIN, for nullable foreign keys and reverse relations.
    Left,
}

impl JoinType {
    /// Returns the SQL keyword for this join type.
    pub const fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT OUTER JOIN",
        }
    }
}

/// The complete query AST representing a SELECT statement.
#[derive(Debug, Clone)]
pub struct Query {
    /// The main table name.
    pub table: String,
    /// Model metadata, needed to resolve relation paths.
    pub meta: Option<&'static ModelMeta>,
    /// Columns to select.
    pub select: Vec<SelectColumn>,
    /// WHERE clause.
    pub where_clause: Option<WhereNode>,
    /// ORDER BY clauses.
    pub order_by: Vec<OrderBy>,
    /// LIMIT.
    pub limit: Option<usize>,
    /// OFFSET.
    pub offset: Option<usize>,
    /// DISTINCT flag.
    pub distinct: bool,
    /// Named annotations in insertion order.
    pub annotations: Vec<(String, Expression)>,
}

impl Query {
    /// Creates a new query for the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            meta: None,
            select: vec![SelectColumn::Star],
            where_clause: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            annotations: Vec::new(),
        }
    }

    /// Creates a new query over a model's table.
    pub fn for_model(meta: &'static ModelMeta) -> Self {
        Self {
            meta: Some(meta),
            order_by: meta.ordering.clone(),
            ..Self::new(meta.db_table.clone())
        }
    }

    /// Adds an annotation. An existing annotation with the same alias is
    /// replaced in place.
    pub fn annotate(&mut self, alias: impl Into<String>, expr: Expression) {
        let alias = alias.into();
        match self.annotations.iter_mut().find(|(name, _)| *name == alias) {
            Some(slot) => slot.1 = expr,
            None => self.annotations.push((alias, expr)),
        }
    }

    /// Returns the annotation registered under `alias`.
    pub fn annotation(&self, alias: &str) -> Option<&Expression> {
        self.annotations
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, expr)| expr)
    }

    /// ANDs a condition onto the WHERE clause.
    pub fn add_where(&mut self, node: WhereNode) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and(node),
            None => node,
        });
    }
}

/// Per-statement compilation state.
struct CompileContext<'q> {
    query: &'q Query,
    params: Vec<Value>,
    joins: Vec<Join>,
    inlining: Vec<String>,
}

impl<'q> CompileContext<'q> {
    fn new(query: &'q Query) -> Self {
        Self {
            query,
            params: Vec::new(),
            joins: Vec::new(),
            inlining: Vec::new(),
        }
    }

    fn add_join(&mut self, join: Join) {
        if !self.joins.iter().any(|j| j.alias == join.alias) {
            self.joins.push(join);
        }
    }
}

/// The SQL compiler translates a [`Query`] AST into parameterized SQL.
///
/// Different backends use different placeholder styles:
/// - PostgreSQL: `$1, $2, $3, ...`
/// - SQLite / MySQL: `?, ?, ?, ...`
#[derive(Debug, Clone, Copy)]
pub struct SqlCompiler {
    backend: DatabaseBackendType,
}

impl SqlCompiler {
    /// Creates a new compiler for the given backend type.
    pub const fn new(backend: DatabaseBackendType) -> Self {
        Self { backend }
    }

    /// Returns the backend this compiler targets.
    pub const fn backend(&self) -> DatabaseBackendType {
        self.backend
    }

    /// Returns a parameter placeholder for the given 1-based index.
    fn placeholder(&self, index: usize) -> String {
        match self.backend {
            DatabaseBackendType::PostgreSQL => format!("${index}"),
            DatabaseBackendType::SQLite | DatabaseBackendType::MySQL => "?".to_string(),
        }
    }

    fn push_param(&self, ctx: &mut CompileContext<'_>, value: Value) -> String {
        ctx.params.push(value);
        self.placeholder(ctx.params.len())
    }

    /// Compiles a SELECT query into SQL and parameters.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::FieldError`] when a field path cannot be
    /// resolved against the model, or when annotations reference each
    /// other in a cycle.
    pub fn compile_select(&self, query: &Query) -> HybridResult<(String, Vec<Value>)> {
        let mut ctx = CompileContext::new(query);

        let mut select_parts = Vec::with_capacity(query.select.len() + query.annotations.len());
        for col in &query.select {
            select_parts.push(match col {
                SelectColumn::Column(path) => self.resolve_field(path, &mut ctx)?,
                SelectColumn::Expression(expr, alias) => {
                    let expr_sql = self.compile_expression(expr, &mut ctx)?;
                    format!("{expr_sql} AS \"{alias}\"")
                }
                SelectColumn::Star => {
                    if query.meta.is_some() {
                        format!("\"{}\".*", query.table)
                    } else {
                        "*".to_string()
                    }
                }
            });
        }
        for (alias, expr) in &query.annotations {
            ctx.inlining.push(alias.clone());
            let expr_sql = self.compile_expression(expr, &mut ctx)?;
            ctx.inlining.pop();
            select_parts.push(format!("{expr_sql} AS \"{alias}\""));
        }

        let where_sql = match &query.where_clause {
            Some(node) => Some(self.compile_where_node(node, &mut ctx)?),
            None => None,
        };

        let mut orders = Vec::with_capacity(query.order_by.len());
        for order in &query.order_by {
            let target = if query.annotation(&order.column).is_some() {
                format!("\"{}\"", order.column)
            } else {
                self.resolve_field(&order.column, &mut ctx)?
            };
            let dir = if order.descending { "DESC" } else { "ASC" };
            orders.push(format!("{target} {dir}"));
        }

        let mut sql = String::from("SELECT ");
        if query.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&select_parts.join(", "));
        sql.push_str(&format!(" FROM \"{}\"", query.table));
        for join in &ctx.joins {
            sql.push_str(&format!(
                " {} \"{}\" AS \"{}\" ON ({} = {})",
                join.join_type.sql_keyword(),
                join.table,
                join.alias,
                join.left,
                join.right
            ));
        }
        if let Some(where_sql) = where_sql {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        if !orders.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok((sql, ctx.params))
    }

    /// Compiles a `SELECT COUNT(*)` over the rows the query would return.
    ///
    /// # Errors
    ///
    /// Same as [`compile_select`](Self::compile_select).
    pub fn compile_count(&self, query: &Query) -> HybridResult<(String, Vec<Value>)> {
        let (inner, params) = self.compile_select(query)?;
        Ok((
            format!("SELECT COUNT(*) AS \"__count\" FROM ({inner}) \"__subquery\""),
            params,
        ))
    }

    /// Compiles an INSERT statement.
    pub fn compile_insert(&self, table: &str, fields: &[(&str, Value)]) -> (String, Vec<Value>) {
        let columns: Vec<String> = fields.iter().map(|(name, _)| format!("\"{name}\"")).collect();
        let placeholders: Vec<String> = (1..=fields.len()).map(|i| self.placeholder(i)).collect();
        let params = fields.iter().map(|(_, v)| v.clone()).collect();
        let sql = if fields.is_empty() {
            format!("INSERT INTO \"{table}\" DEFAULT VALUES")
        } else {
            format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        (sql, params)
    }

    /// Compiles a lone expression with no model context.
    ///
    /// Field references compile to bare quoted column names.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::FieldError`] for relation paths, which need
    /// model metadata to resolve.
    pub fn compile_standalone(&self, expr: &Expression) -> HybridResult<(String, Vec<Value>)> {
        let query = Query::new("");
        let mut ctx = CompileContext::new(&query);
        let sql = self.compile_expression(expr, &mut ctx)?;
        Ok((sql, ctx.params))
    }

    /// Resolves a field path to a quoted, table-qualified column, adding the
    /// joins the path traverses.
    fn resolve_field(&self, path: &str, ctx: &mut CompileContext<'_>) -> HybridResult<String> {
        let Some(meta) = ctx.query.meta else {
            if path.contains(LOOKUP_SEP) {
                return Err(HybridError::FieldError(format!(
                    "Cannot resolve '{path}' without model metadata"
                )));
            }
            return Ok(format!("\"{path}\""));
        };

        let segments: Vec<&str> = path.split(LOOKUP_SEP).collect();
        let Some((last, relations)) = segments.split_last() else {
            return Err(HybridError::FieldError("Empty field path".into()));
        };

        let mut current = meta;
        let mut alias = meta.db_table.clone();
        let mut traversed = String::new();
        for segment in relations {
            if !traversed.is_empty() {
                traversed.push_str(LOOKUP_SEP);
            }
            traversed.push_str(segment);

            let (join, target) = if let Some(field) = current.field(segment) {
                let target = field.related_meta().ok_or_else(|| {
                    HybridError::FieldError(format!(
                        "Cannot resolve keyword '{segment}' into a relation: \
                         '{}.{segment}' is not a foreign key",
                        current.model_name
                    ))
                })?;
                let join = Join {
                    table: target.db_table.clone(),
                    alias: traversed.clone(),
                    join_type: if field.null { JoinType::Left } else { JoinType::Inner },
                    left: format!("\"{alias}\".\"{}\"", field.column),
                    right: format!("\"{traversed}\".\"{}\"", target.pk_column()),
                };
                (join, target)
            } else if let Some(relation) = current.reverse(segment) {
                let child = relation.related_meta();
                let fk = relation
                    .foreign_key()
                    .filter(|fk| fk.related_meta().is_some_and(|m| m.db_table == current.db_table))
                    .ok_or_else(|| {
                        HybridError::FieldError(format!(
                            "Reverse relation '{}.{segment}' needs '{}.{}' to be a foreign key to '{}'",
                            current.model_name, child.model_name, relation.field, current.model_name
                        ))
                    })?;
                // A parent without children still has a row to compare.
                let join = Join {
                    table: child.db_table.clone(),
                    alias: traversed.clone(),
                    join_type: JoinType::Left,
                    left: format!("\"{alias}\".\"{}\"", current.pk_column()),
                    right: format!("\"{traversed}\".\"{}\"", fk.column),
                };
                (join, child)
            } else {
                return Err(unknown_field(segment, current));
            };
            ctx.add_join(join);
            alias.clone_from(&traversed);
            current = target;
        }

        let column = if *last == "pk" {
            current.pk_column()
        } else if let Some(field) = current.field(last) {
            field.column.as_str()
        } else if let Some(field) = current.fields.iter().find(|f| f.column == *last) {
            field.column.as_str()
        } else {
            return Err(unknown_field(last, current));
        };
        Ok(format!("\"{alias}\".\"{column}\""))
    }

    /// Compiles the left-hand side of a condition: an inlined annotation
    /// or a resolved field.
    fn compile_reference(&self, name: &str, ctx: &mut CompileContext<'_>) -> HybridResult<String> {
        let Some(expr) = ctx.query.annotation(name) else {
            return self.resolve_field(name, ctx);
        };
        if ctx.inlining.iter().any(|n| n == name) {
            return Err(HybridError::FieldError(format!(
                "Annotation '{name}' refers to itself"
            )));
        }
        ctx.inlining.push(name.to_string());
        let sql = self.compile_expression(expr, ctx);
        ctx.inlining.pop();
        sql
    }

    /// Compiles a `WhereNode` into SQL.
    fn compile_where_node(&self, node: &WhereNode, ctx: &mut CompileContext<'_>) -> HybridResult<String> {
        match node {
            WhereNode::Condition { column, lookup } => {
                let lhs = self.compile_reference(column, ctx)?;
                self.compile_lookup(&lhs, lookup, ctx)
            }
            WhereNode::And(children) => self.compile_junction(children, " AND ", "1=1", ctx),
            WhereNode::Or(children) => self.compile_junction(children, " OR ", "1=0", ctx),
            WhereNode::Not(inner) => Ok(format!("NOT ({})", self.compile_where_node(inner, ctx)?)),
        }
    }

    fn compile_junction(
        &self,
        children: &[WhereNode],
        connector: &str,
        empty: &str,
        ctx: &mut CompileContext<'_>,
    ) -> HybridResult<String> {
        if children.is_empty() {
            return Ok(empty.to_string());
        }
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            parts.push(self.compile_where_node(child, ctx)?);
        }
        Ok(format!("({})", parts.join(connector)))
    }

    /// Compiles a single lookup against an already-compiled left-hand side.
    fn compile_lookup(
        &self,
        lhs: &str,
        lookup: &Lookup,
        ctx: &mut CompileContext<'_>,
    ) -> HybridResult<String> {
        let sql = match lookup {
            Lookup::Exact(Expression::Value(Value::Null)) | Lookup::IsNull(true) => {
                format!("{lhs} IS NULL")
            }
            Lookup::IsNull(false) => format!("{lhs} IS NOT NULL"),
            Lookup::Exact(rhs) => self.binary(lhs, "=", rhs, ctx)?,
            Lookup::Gt(rhs) => self.binary(lhs, ">", rhs, ctx)?,
            Lookup::Gte(rhs) => self.binary(lhs, ">=", rhs, ctx)?,
            Lookup::Lt(rhs) => self.binary(lhs, "<", rhs, ctx)?,
            Lookup::Lte(rhs) => self.binary(lhs, "<=", rhs, ctx)?,
            Lookup::IExact(rhs) => {
                let rhs = self.compile_expression(rhs, ctx)?;
                format!("LOWER({lhs}) = LOWER({rhs})")
            }
            Lookup::Contains(rhs) => self.pattern(lhs, rhs, PatternKind::Contains, false, ctx)?,
            Lookup::IContains(rhs) => self.pattern(lhs, rhs, PatternKind::Contains, true, ctx)?,
            Lookup::StartsWith(rhs) => self.pattern(lhs, rhs, PatternKind::StartsWith, false, ctx)?,
            Lookup::IStartsWith(rhs) => self.pattern(lhs, rhs, PatternKind::StartsWith, true, ctx)?,
            Lookup::EndsWith(rhs) => self.pattern(lhs, rhs, PatternKind::EndsWith, false, ctx)?,
            Lookup::IEndsWith(rhs) => self.pattern(lhs, rhs, PatternKind::EndsWith, true, ctx)?,
            Lookup::In(values) => {
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| self.push_param(ctx, v.clone()))
                    .collect();
                format!("{lhs} IN ({})", placeholders.join(", "))
            }
            Lookup::Range(low, high) => {
                let low = self.compile_expression(low, ctx)?;
                let high = self.compile_expression(high, ctx)?;
                format!("{lhs} BETWEEN {low} AND {high}")
            }
            Lookup::Regex(pattern) => {
                let ph = self.push_param(ctx, Value::String(pattern.clone()));
                match self.backend {
                    DatabaseBackendType::PostgreSQL => format!("{lhs} ~ {ph}"),
                    _ => format!("{lhs} REGEXP {ph}"),
                }
            }
            Lookup::IRegex(pattern) => match self.backend {
                DatabaseBackendType::PostgreSQL => {
                    let ph = self.push_param(ctx, Value::String(pattern.clone()));
                    format!("{lhs} ~* {ph}")
                }
                _ => {
                    let ph = self.push_param(ctx, Value::String(format!("(?i){pattern}")));
                    format!("{lhs} REGEXP {ph}")
                }
            },
            Lookup::Custom { lookup, operand } => {
                let rhs = self.compile_expression(operand, ctx)?;
                lookup.render(lhs, &rhs)
            }
        };
        Ok(sql)
    }

    fn binary(
        &self,
        lhs: &str,
        op: &str,
        rhs: &Expression,
        ctx: &mut CompileContext<'_>,
    ) -> HybridResult<String> {
        let rhs = self.compile_expression(rhs, ctx)?;
        Ok(format!("{lhs} {op} {rhs}"))
    }

    /// Compiles the substring-family lookups.
    ///
    /// SQLite's `LIKE` ignores ASCII case, so matching there goes through
    /// `INSTR`/`SUBSTR` instead.
    fn pattern(
        &self,
        lhs: &str,
        rhs: &Expression,
        kind: PatternKind,
        ignore_case: bool,
        ctx: &mut CompileContext<'_>,
    ) -> HybridResult<String> {
        let lower = |sql: String| if ignore_case { format!("LOWER({sql})") } else { sql };

        if self.backend == DatabaseBackendType::SQLite {
            let lhs = lower(lhs.to_string());
            if *rhs == Expression::Value(Value::String(String::new())) {
                return Ok(format!("{lhs} IS NOT NULL"));
            }
            let rhs_sql = lower(self.compile_expression(rhs, ctx)?);
            return Ok(match kind {
                PatternKind::Contains => format!("INSTR({lhs}, {rhs_sql}) > 0"),
                PatternKind::StartsWith => format!("INSTR({lhs}, {rhs_sql}) = 1"),
                PatternKind::EndsWith => {
                    let again = lower(self.compile_expression(rhs, ctx)?);
                    format!("SUBSTR({lhs}, -LENGTH({rhs_sql})) = {again}")
                }
            });
        }

        let ilike = ignore_case && self.backend == DatabaseBackendType::PostgreSQL;
        let lower = |sql: String| if ilike { sql } else { lower(sql) };
        let rhs_sql = if let Expression::Value(Value::String(s)) = rhs {
            let escaped = escape_like(s);
            let value = match kind {
                PatternKind::Contains => format!("%{escaped}%"),
                PatternKind::StartsWith => format!("{escaped}%"),
                PatternKind::EndsWith => format!("%{escaped}"),
            };
            self.push_param(ctx, Value::String(value))
        } else {
            let operand = self.compile_expression(rhs, ctx)?;
            match kind {
                PatternKind::Contains => format!("CONCAT('%', {operand}, '%')"),
                PatternKind::StartsWith => format!("CONCAT({operand}, '%')"),
                PatternKind::EndsWith => format!("CONCAT('%', {operand})"),
            }
        };
        let op = if ilike { "ILIKE" } else { "LIKE" };
        Ok(format!("{} {op} {}", lower(lhs.to_string()), lower(rhs_sql)))
    }

    /// Compiles an expression into SQL.
    fn compile_expression(&self, expr: &Expression, ctx: &mut CompileContext<'_>) -> HybridResult<String> {
        let sql = match expr {
            Expression::Col(name) => format!("\"{name}\""),
            Expression::Value(val) => self.push_param(ctx, val.clone()),
            Expression::F(name) => self.compile_reference(name, ctx)?,
            Expression::Func { name, args } => self.compile_func(name, args, ctx)?,
            Expression::Aggregate {
                func,
                field,
                distinct,
            } => {
                let field_sql = self.compile_expression(field, ctx)?;
                let distinct_str = if *distinct { "DISTINCT " } else { "" };
                format!("{}({distinct_str}{field_sql})", func.sql_name())
            }
            Expression::Case { whens, default } => {
                let mut sql = "CASE".to_string();
                for when in whens {
                    let node = WhereNode::from_q(&when.condition);
                    let cond_sql = self.compile_where_node(&node, ctx)?;
                    let then_sql = self.compile_expression(&when.then, ctx)?;
                    sql.push_str(&format!(" WHEN {cond_sql} THEN {then_sql}"));
                }
                if let Some(default) = default {
                    sql.push_str(&format!(" ELSE {}", self.compile_expression(default, ctx)?));
                }
                sql.push_str(" END");
                sql
            }
            Expression::Cast { expr, data_type } => {
                format!("CAST({} AS {data_type})", self.compile_expression(expr, ctx)?)
            }
            Expression::Add(l, r) => self.arithmetic(l, "+", r, ctx)?,
            Expression::Sub(l, r) => self.arithmetic(l, "-", r, ctx)?,
            Expression::Mul(l, r) => self.arithmetic(l, "*", r, ctx)?,
            Expression::Div(l, r) => self.arithmetic(l, "/", r, ctx)?,
        };
        Ok(sql)
    }

    fn arithmetic(
        &self,
        left: &Expression,
        op: &str,
        right: &Expression,
        ctx: &mut CompileContext<'_>,
    ) -> HybridResult<String> {
        let l = self.compile_expression(left, ctx)?;
        let r = self.compile_expression(right, ctx)?;
        Ok(format!("({l} {op} {r})"))
    }

    /// Compiles a function call, rewriting the few functions SQLite spells
    /// differently.
    fn compile_func(&self, name: &str, args: &[Expression], ctx: &mut CompileContext<'_>) -> HybridResult<String> {
        let mut arg_parts = Vec::with_capacity(args.len());
        for arg in args {
            arg_parts.push(self.compile_expression(arg, ctx)?);
        }
        if self.backend == DatabaseBackendType::SQLite {
            match name {
                "CONCAT" => {
                    let parts: Vec<String> = arg_parts
                        .iter()
                        .map(|a| format!("COALESCE({a}, '')"))
                        .collect();
                    return Ok(format!("({})", parts.join(" || ")));
                }
                "MOD" if arg_parts.len() == 2 => {
                    return Ok(format!("({} % {})", arg_parts[0], arg_parts[1]));
                }
                _ => {}
            }
        }
        Ok(format!("{name}({})", arg_parts.join(", ")))
    }
}

#[derive(Debug, Clone, Copy)]
enum PatternKind {
    Contains,
    StartsWith,
    EndsWith,
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn unknown_field(name: &str, meta: &ModelMeta) -> HybridError {
    let mut choices: Vec<&str> = meta
        .fields
        .iter()
        .map(|f| f.name)
        .chain(meta.reverse_relations.iter().map(|r| r.name))
        .collect();
    choices.sort_unstable();
    HybridError::FieldError(format!(
        "Cannot resolve keyword '{name}' into field. Choices are: {}",
        choices.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldDef, FieldType, OnDelete};
    use crate::query::custom_lookups::{register_lookup, CustomLookup};
    use crate::query::expressions::{functions, When};
    use std::sync::LazyLock;

    fn teacher_meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::new(
                "school",
                "teacher",
                vec![
                    FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                    FieldDef::new("first_name", FieldType::CharField),
                    FieldDef::new("last_name", FieldType::CharField),
                ],
            )
            .reverse_relation("classroom", classroom_meta, "teacher")
            .reverse_relation("assisted", classroom_meta, "assistant")
            .reverse_relation("named", classroom_meta, "name")
        });
        &META
    }

    fn classroom_meta() -> &'static ModelMeta {
        static META: LazyLock<ModelMeta> = LazyLock::new(|| {
            ModelMeta::new(
                "school",
                "classroom",
                vec![
                    FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                    FieldDef::new("name", FieldType::CharField),
                    FieldDef::foreign_key("teacher", teacher_meta, OnDelete::Cascade),
                    FieldDef::foreign_key("assistant", teacher_meta, OnDelete::SetNull).nullable(),
                ],
            )
        });
        &META
    }

    fn sqlite() -> SqlCompiler {
        SqlCompiler::new(DatabaseBackendType::SQLite)
    }

    fn pg() -> SqlCompiler {
        SqlCompiler::new(DatabaseBackendType::PostgreSQL)
    }

    fn filtered(q: Q) -> Query {
        let mut query = Query::for_model(classroom_meta());
        query.add_where(WhereNode::from_q(&q));
        query
    }

    #[test]
    fn test_select_model_star() {
        let (sql, params) = sqlite().compile_select(&Query::for_model(teacher_meta())).unwrap();
        assert_eq!(sql, "SELECT \"school_teacher\".* FROM \"school_teacher\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_raw_table_pg() {
        let mut query = Query::new("users");
        query.add_where(WhereNode::from_q(&Q::kwarg("name", "Alice")));
        let (sql, params) = pg().compile_select(&query).unwrap();
        assert_eq!(sql, "SELECT * FROM \"users\" WHERE \"name\" = $1");
        assert_eq!(params, vec![Value::from("Alice")]);
    }

    #[test]
    fn test_where_qualifies_columns() {
        let (sql, _) = sqlite().compile_select(&filtered(Q::kwarg("name", "IT 101"))).unwrap();
        assert!(sql.ends_with("WHERE \"school_classroom\".\"name\" = ?"), "{sql}");
    }

    #[test]
    fn test_relation_path_adds_join() {
        let query = filtered(Q::kwarg("teacher__first_name__startswith", "Gr"));
        let (sql, params) = pg().compile_select(&query).unwrap();
        assert_eq!(
            sql,
            "SELECT \"school_classroom\".* FROM \"school_classroom\" \
             INNER JOIN \"school_teacher\" AS \"teacher\" \
             ON (\"school_classroom\".\"teacher_id\" = \"teacher\".\"id\") \
             WHERE \"teacher\".\"first_name\" LIKE $1"
        );
        assert_eq!(params, vec![Value::from("Gr%")]);
    }

    #[test]
    fn test_nullable_relation_uses_left_join() {
        let query = filtered(Q::kwarg("assistant__last_name", "Hopper"));
        let (sql, _) = sqlite().compile_select(&query).unwrap();
        assert!(sql.contains("LEFT OUTER JOIN \"school_teacher\" AS \"assistant\""), "{sql}");
    }

    #[test]
    fn test_join_added_once() {
        let query = filtered(Q::kwarg("teacher__first_name", "Grace") & Q::kwarg("teacher__last_name", "Hopper"));
        let (sql, _) = sqlite().compile_select(&query).unwrap();
        assert_eq!(sql.matches("JOIN").count(), 1, "{sql}");
    }

    #[test]
    fn test_unknown_field() {
        let err = sqlite().compile_select(&filtered(Q::kwarg("color", "red"))).unwrap_err();
        assert!(err.to_string().contains("Cannot resolve keyword 'color' into field"), "{err}");
    }

    #[test]
    fn test_non_relation_in_path() {
        let err = sqlite()
            .compile_select(&filtered(Q::kwarg("name__first_name", "x")))
            .unwrap_err();
        assert!(err.to_string().contains("not a foreign key"), "{err}");
    }

    #[test]
    fn test_reverse_relation_joins_children() {
        let mut query = Query::for_model(teacher_meta());
        query.add_where(WhereNode::from_q(&Q::kwarg("classroom__name", "IT 101")));
        query.distinct = true;
        let (sql, params) = sqlite().compile_select(&query).unwrap();
        assert_eq!(
            sql,
            "SELECT DISTINCT \"school_teacher\".* FROM \"school_teacher\" \
             LEFT OUTER JOIN \"school_classroom\" AS \"classroom\" \
             ON (\"school_teacher\".\"id\" = \"classroom\".\"teacher_id\") \
             WHERE \"classroom\".\"name\" = ?"
        );
        assert_eq!(params, vec![Value::from("IT 101")]);
    }

    #[test]
    fn test_reverse_then_forward() {
        let mut query = Query::for_model(teacher_meta());
        query.add_where(WhereNode::from_q(&Q::kwarg("assisted__teacher__last_name", "Hopper")));
        let (sql, _) = sqlite().compile_select(&query).unwrap();
        assert!(
            sql.contains(
                "LEFT OUTER JOIN \"school_classroom\" AS \"assisted\" \
                 ON (\"school_teacher\".\"id\" = \"assisted\".\"assistant_id\") \
                 INNER JOIN \"school_teacher\" AS \"assisted__teacher\" \
                 ON (\"assisted\".\"teacher_id\" = \"assisted__teacher\".\"id\")"
            ),
            "{sql}"
        );
        assert!(sql.ends_with("WHERE \"assisted__teacher\".\"last_name\" = ?"), "{sql}");
    }

    #[test]
    fn test_reverse_relation_needs_foreign_key() {
        let mut query = Query::for_model(teacher_meta());
        query.add_where(WhereNode::from_q(&Q::kwarg("named__name", "x")));
        let err = sqlite().compile_select(&query).unwrap_err();
        assert!(matches!(err, HybridError::FieldError(ref msg) if msg.contains("teacher.named")), "{err}");

        let mut query = Query::for_model(teacher_meta());
        query.add_where(WhereNode::from_q(&Q::kwarg("pupil__name", "x")));
        let err = sqlite().compile_select(&query).unwrap_err();
        assert!(err.to_string().contains("assisted, classroom, first_name"), "{err}");
    }

    #[test]
    fn test_annotation_selected_and_inlined_in_where() {
        let mut query = Query::for_model(teacher_meta());
        query.annotate(
            "hybrid_full",
            functions::concat(vec![
                Expression::f("first_name"),
                Expression::value(" "),
                Expression::f("last_name"),
            ]),
        );
        query.add_where(WhereNode::from_q(&Q::kwarg("hybrid_full", "Grace Hopper")));
        let (sql, params) = sqlite().compile_select(&query).unwrap();
        let concat = "(COALESCE(\"school_teacher\".\"first_name\", '') || COALESCE(?, '') || \
                      COALESCE(\"school_teacher\".\"last_name\", ''))";
        assert_eq!(
            sql,
            format!(
                "SELECT \"school_teacher\".*, {concat} AS \"hybrid_full\" \
                 FROM \"school_teacher\" WHERE {concat} = ?"
            )
        );
        assert_eq!(
            params,
            vec![Value::from(" "), Value::from(" "), Value::from("Grace Hopper")]
        );
    }

    #[test]
    fn test_f_reference_to_annotation() {
        let mut query = Query::for_model(teacher_meta());
        query.annotate("a", Expression::f("id") * Expression::value(2));
        query.annotate("b", Expression::f("id") + Expression::value(1));
        query.add_where(WhereNode::from_q(&Q::filter("a", Lookup::Lt(Expression::f("b")))));
        let (sql, _) = sqlite().compile_select(&query).unwrap();
        assert!(
            sql.ends_with(
                "WHERE (\"school_teacher\".\"id\" * ?) < (\"school_teacher\".\"id\" + ?)"
            ),
            "{sql}"
        );
    }

    #[test]
    fn test_annotate_replaces_same_alias() {
        let mut query = Query::new("t");
        query.annotate("x", Expression::value(1));
        query.annotate("y", Expression::value(2));
        query.annotate("x", Expression::value(3));
        assert_eq!(query.annotations.len(), 2);
        assert_eq!(query.annotations[0].0, "x");
        assert_eq!(query.annotation("x"), Some(&Expression::value(3)));
    }

    #[test]
    fn test_self_referencing_annotation_errors() {
        let mut query = Query::new("t");
        query.annotate("x", Expression::f("x") + Expression::value(1));
        assert!(sqlite().compile_select(&query).is_err());
    }

    #[test]
    fn test_order_by_annotation_alias() {
        let mut query = Query::for_model(teacher_meta());
        query.annotate("score", Expression::f("id") * Expression::value(3));
        query.order_by = vec![OrderBy::parse("-score"), OrderBy::asc("last_name")];
        let (sql, _) = sqlite().compile_select(&query).unwrap();
        assert!(
            sql.ends_with("ORDER BY \"score\" DESC, \"school_teacher\".\"last_name\" ASC"),
            "{sql}"
        );
    }

    #[test]
    fn test_case_when_in_annotation() {
        let mut query = Query::for_model(classroom_meta());
        query.annotate(
            "is_it",
            Expression::case(
                vec![When::new(Q::kwarg("name__contains", "IT"), Value::Bool(true))],
                Some(Expression::value(false)),
            ),
        );
        let (sql, params) = sqlite().compile_select(&query).unwrap();
        assert!(
            sql.contains(
                "CASE WHEN INSTR(\"school_classroom\".\"name\", ?) > 0 THEN ? ELSE ? END AS \"is_it\""
            ),
            "{sql}"
        );
        assert_eq!(params, vec![Value::from("IT"), Value::Bool(true), Value::Bool(false)]);
    }

    #[test]
    fn test_pattern_lookups_sqlite() {
        let c = sqlite();
        let cases = [
            ("name__contains", "INSTR(\"school_classroom\".\"name\", ?) > 0"),
            ("name__icontains", "INSTR(LOWER(\"school_classroom\".\"name\"), LOWER(?)) > 0"),
            ("name__startswith", "INSTR(\"school_classroom\".\"name\", ?) = 1"),
            (
                "name__iendswith",
                "SUBSTR(LOWER(\"school_classroom\".\"name\"), -LENGTH(LOWER(?))) = LOWER(?)",
            ),
        ];
        for (key, expected) in cases {
            let (sql, _) = c.compile_select(&filtered(Q::kwarg(key, "ab"))).unwrap();
            assert!(sql.ends_with(expected), "{key}: {sql}");
        }
    }

    #[test]
    fn test_pattern_lookups_pg_escape() {
        let (sql, params) = pg().compile_select(&filtered(Q::kwarg("name__icontains", "50%"))).unwrap();
        assert!(sql.ends_with("\"school_classroom\".\"name\" ILIKE $1"), "{sql}");
        assert_eq!(params, vec![Value::from("%50\\%%")]);
    }

    #[test]
    fn test_pattern_with_expression_operand_pg() {
        let q = Q::filter("name", Lookup::EndsWith(Expression::f("teacher__last_name")));
        let (sql, _) = pg().compile_select(&filtered(q)).unwrap();
        assert!(
            sql.ends_with("\"school_classroom\".\"name\" LIKE CONCAT('%', \"teacher\".\"last_name\")"),
            "{sql}"
        );
    }

    #[test]
    fn test_in_range_isnull() {
        let c = pg();
        let q = Q::kwarg("id__in", vec![Value::Int(1), Value::Int(2)])
            & Q::kwarg("id__range", vec![Value::Int(0), Value::Int(9)])
            & Q::kwarg("assistant__isnull", true);
        let (sql, params) = c.compile_select(&filtered(q)).unwrap();
        assert!(sql.ends_with(
            "WHERE (\"school_classroom\".\"id\" IN ($1, $2) AND \
             \"school_classroom\".\"id\" BETWEEN $3 AND $4 AND \
             \"school_classroom\".\"assistant_id\" IS NULL)"
        ), "{sql}");
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let q = Q::filter("id", Lookup::In(vec![]));
        let (sql, _) = sqlite().compile_select(&filtered(q)).unwrap();
        assert!(sql.ends_with("WHERE 1=0"), "{sql}");
    }

    #[test]
    fn test_not_and_or() {
        let q = !(Q::kwarg("name", "a") | Q::kwarg("name", "b"));
        let (sql, _) = sqlite().compile_select(&filtered(q)).unwrap();
        assert!(sql.ends_with(
            "WHERE NOT ((\"school_classroom\".\"name\" = ? OR \"school_classroom\".\"name\" = ?))"
        ), "{sql}");
    }

    #[test]
    fn test_custom_lookup() {
        register_lookup(CustomLookup::new("compiler_test_ne", "{column} <> {value}"));
        let (sql, _) = sqlite()
            .compile_select(&filtered(Q::kwarg("name__compiler_test_ne", "x")))
            .unwrap();
        assert!(sql.ends_with("\"school_classroom\".\"name\" <> ?"), "{sql}");
    }

    #[test]
    fn test_limit_offset_distinct() {
        let mut query = Query::new("t");
        query.distinct = true;
        query.limit = Some(10);
        query.offset = Some(5);
        let (sql, _) = sqlite().compile_select(&query).unwrap();
        assert_eq!(sql, "SELECT DISTINCT * FROM \"t\" LIMIT 10 OFFSET 5");
    }

    #[test]
    fn test_count_wraps_select() {
        let (sql, params) = sqlite().compile_count(&filtered(Q::kwarg("name", "x"))).unwrap();
        assert!(sql.starts_with("SELECT COUNT(*) AS \"__count\" FROM (SELECT"), "{sql}");
        assert!(sql.ends_with(") \"__subquery\""));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_insert() {
        let (sql, params) = pg().compile_insert("t", &[("a", Value::Int(1)), ("b", Value::from("x"))]);
        assert_eq!(sql, "INSERT INTO \"t\" (\"a\", \"b\") VALUES ($1, $2)");
        assert_eq!(params.len(), 2);
        let (sql, _) = sqlite().compile_insert("t", &[]);
        assert_eq!(sql, "INSERT INTO \"t\" DEFAULT VALUES");
    }

    #[test]
    fn test_standalone_rejects_paths() {
        assert!(sqlite().compile_standalone(&Expression::f("a__b")).is_err());
    }
}
