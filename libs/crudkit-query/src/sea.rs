//! `SeaORM` rendering of compiled filters, relation constraints and pages.

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Select,
    sea_query::{Expr, LikeExpr, SelectStatement, SimpleExpr},
};

use crate::condition::{Bound, FieldCondition, OperatorSet};
use crate::filter::{EntityFilter, FieldFilter, FilterInput};
use crate::page::{Order, Page};
use crate::value::FieldValue;

/// Maps declared field names to the entity's columns.
pub trait FilterableEntity: EntityTrait {
    /// Resolve a field name to a column.
    ///
    /// Returns `None` for names the entity does not map; conditions on such
    /// fields fail closed.
    fn resolve_field(name: &str) -> Option<Self::Column>;
}

fn sea_value(v: &FieldValue) -> sea_orm::Value {
    match v {
        FieldValue::Null => sea_orm::Value::String(None),
        FieldValue::String(s) => sea_orm::Value::from(s.clone()),
        FieldValue::Int(n) => sea_orm::Value::from(*n),
        FieldValue::Float(n) => sea_orm::Value::from(*n),
        FieldValue::Bool(b) => sea_orm::Value::from(*b),
        FieldValue::DateTime(dt) => sea_orm::Value::from(*dt),
    }
}

fn sea_expr(v: &FieldValue) -> SimpleExpr {
    Expr::value(sea_value(v))
}

/// Escape `LIKE` metacharacters so the operand is matched literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn like(pattern: String) -> LikeExpr {
    LikeExpr::new(pattern).escape('\\')
}

/// Build a deny-all condition (`WHERE false`).
#[must_use]
pub fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

/// Builds a `SeaORM` `Condition` from a parsed filter.
///
/// | Filter | Behavior |
/// |--------|----------|
/// | absent | No filtering (`WHERE true`) |
/// | `null` | `WHERE false` |
/// | field map | AND of field conditions |
/// | `OR` list | OR of ANDed branches |
///
/// A branch referencing a field the entity does not resolve is dropped; if
/// every branch is dropped the result is deny-all.
#[must_use]
pub fn build_filter_condition<E>(input: &FilterInput) -> Condition
where
    E: FilterableEntity,
    E::Column: ColumnTrait + Copy,
{
    match input {
        FilterInput::Absent => Condition::all(),
        FilterInput::Null => deny_all(),
        FilterInput::Filter(filter) => build_entity_condition::<E>(filter),
    }
}

fn build_entity_condition<E>(filter: &EntityFilter) -> Condition
where
    E: FilterableEntity,
    E::Column: ColumnTrait + Copy,
{
    let compiled: Vec<Condition> = filter
        .branches()
        .iter()
        .filter_map(build_branch_condition::<E>)
        .collect();

    match compiled.len() {
        0 => deny_all(),
        1 => compiled.into_iter().next().unwrap_or_else(deny_all),
        _ => compiled
            .into_iter()
            .fold(Condition::any(), |or_cond, c| or_cond.add(c)),
    }
}

/// AND of one branch's field conditions, `None` if any field is unresolved.
fn build_branch_condition<E>(branch: &FieldFilter) -> Option<Condition>
where
    E: FilterableEntity,
    E::Column: ColumnTrait + Copy,
{
    let mut and_cond = Condition::all();
    for (field, cond) in &branch.conditions {
        let Some(col) = E::resolve_field(field.name) else {
            tracing::warn!(field = field.name, "field has no column mapping; branch dropped");
            return None;
        };
        and_cond = match cond {
            FieldCondition::Equals(FieldValue::Null) => and_cond.add(Expr::col(col).is_null()),
            FieldCondition::Equals(v) => and_cond.add(Expr::col(col).eq(sea_expr(v))),
            FieldCondition::Operators(ops) => add_operators(and_cond, col, ops),
        };
    }
    Some(and_cond)
}

fn add_operators<C>(mut cond: Condition, col: C, ops: &OperatorSet) -> Condition
where
    C: ColumnTrait + Copy,
{
    if let Some(prefix) = &ops.starts_with {
        cond = cond.add(Expr::col(col).like(like(format!("{}%", escape_like(prefix)))));
    }
    if let Some(suffix) = &ops.ends_with {
        cond = cond.add(Expr::col(col).like(like(format!("%{}", escape_like(suffix)))));
    }
    if let Some(needle) = &ops.contains {
        cond = cond.add(Expr::col(col).like(like(format!("%{}%", escape_like(needle)))));
    }
    if let Some(values) = &ops.one_of {
        let sea_values: Vec<sea_orm::Value> = values.iter().map(sea_value).collect();
        cond = cond.add(Expr::col(col).is_in(sea_values));
    }
    match &ops.lower {
        Some(Bound::Exclusive(v)) => cond = cond.add(Expr::col(col).gt(sea_expr(v))),
        Some(Bound::Inclusive(v)) => cond = cond.add(Expr::col(col).gte(sea_expr(v))),
        None => {}
    }
    match &ops.upper {
        Some(Bound::Exclusive(v)) => cond = cond.add(Expr::col(col).lt(sea_expr(v))),
        Some(Bound::Inclusive(v)) => cond = cond.add(Expr::col(col).lte(sea_expr(v))),
        None => {}
    }
    cond
}

/// `SELECT key FROM E WHERE <filter>`.
///
/// Absent and `null` filters both select every key.
#[must_use]
pub fn key_subquery<E>(key: E::Column, input: &FilterInput) -> SelectStatement
where
    E: FilterableEntity,
    E::Column: ColumnTrait + Copy,
{
    let cond = match input {
        FilterInput::Filter(filter) => build_entity_condition::<E>(filter),
        FilterInput::Absent | FilterInput::Null => Condition::all(),
    };
    E::find()
        .select_only()
        .column(key)
        .filter(cond)
        .into_query()
}

/// Constrain `local` by the records of `E` whose `key` it references.
///
/// | Filter | Condition |
/// |--------|-----------|
/// | absent | none |
/// | `null` | `local NOT IN (SELECT key FROM E)` |
/// | filter | `local IN (SELECT key FROM E WHERE filter)` |
///
/// One rendering serves both the to-one `is` and the to-many `some`/`none`
/// forms: a record matches `some f` exactly when one of its linked keys
/// passes `f`.
#[must_use]
pub fn linked_condition<E, C>(local: C, key: E::Column, input: &FilterInput) -> Condition
where
    E: FilterableEntity,
    E::Column: ColumnTrait + Copy,
    C: ColumnTrait + Copy,
{
    match input {
        FilterInput::Absent => Condition::all(),
        FilterInput::Null => Condition::all().add(local.not_in_subquery(key_subquery::<E>(key, input))),
        FilterInput::Filter(_) => Condition::all().add(local.in_subquery(key_subquery::<E>(key, input))),
    }
}

/// Like [`linked_condition`] for relations stored in a join table `J`.
///
/// `join_local` references `local`, `join_remote` references `key` of `E`.
#[must_use]
pub fn linked_through<J, E, C>(
    local: C,
    join_local: J::Column,
    join_remote: J::Column,
    key: E::Column,
    input: &FilterInput,
) -> Condition
where
    J: EntityTrait,
    J::Column: ColumnTrait + Copy,
    E: FilterableEntity,
    E::Column: ColumnTrait + Copy,
    C: ColumnTrait + Copy,
{
    let links = J::find().select_only().column(join_local);
    match input {
        FilterInput::Absent => Condition::all(),
        FilterInput::Null => Condition::all().add(local.not_in_subquery(links.into_query())),
        FilterInput::Filter(_) => {
            let links = links
                .filter(join_remote.in_subquery(key_subquery::<E>(key, input)))
                .into_query();
            Condition::all().add(local.in_subquery(links))
        }
    }
}

/// Order, offset and limit a select by a resolved page.
///
/// Rows are always ordered by `id` last so pages are stable.
#[must_use]
pub fn apply_page<E>(select: Select<E>, page: &Page) -> Select<E>
where
    E: FilterableEntity,
    E::Column: ColumnTrait + Copy,
{
    let mut select = select;
    if let Some(col) = page.order_by.and_then(E::resolve_field) {
        select = match page.order {
            Order::Asc => select.order_by_asc(col),
            Order::Desc => select.order_by_desc(col),
        };
    }
    if let Some(id) = E::resolve_field("id") {
        select = select.order_by_asc(id);
    }
    select.offset(page.skip()).limit(page.take())
}
