//! Canonical function shortcuts over the shared builder
//!
//! Aggregates return an [`Aggregate`] for use in `group_by`; their argument is
//! a collection, usually the group variable or a projection of it. Scalar
//! functions return an invocation node.

use crate::builder::QueryBuilder;
use crate::selector::IntoSelection;
use qtree_ir::{Aggregate, Expr, Result};

fn qb() -> &'static QueryBuilder {
    QueryBuilder::shared()
}

fn aggregate(name: &str, collection: impl IntoSelection) -> Result<Aggregate> {
    let collection = qb().resolve(collection)?;
    qb().aggregate(name, vec![collection])
}

pub fn count(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("Count", collection)
}

pub fn big_count(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("BigCount", collection)
}

pub fn count_distinct(collection: impl IntoSelection) -> Result<Aggregate> {
    let collection = qb().resolve(collection)?;
    qb().aggregate_distinct("Count", vec![collection])
}

pub fn sum(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("Sum", collection)
}

pub fn avg(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("Avg", collection)
}

pub fn min(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("Min", collection)
}

pub fn max(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("Max", collection)
}

pub fn st_dev(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("StDev", collection)
}

pub fn st_dev_p(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("StDevP", collection)
}

pub fn var(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("Var", collection)
}

pub fn var_p(collection: impl IntoSelection) -> Result<Aggregate> {
    aggregate("VarP", collection)
}

/// The group's elements, nested as a collection.
pub fn group(collection: impl IntoSelection) -> Result<Aggregate> {
    let collection = qb().resolve(collection)?;
    qb().group_aggregate(collection)
}

fn invoke1(name: &str, argument: impl IntoSelection) -> Result<Expr> {
    let argument = qb().resolve(argument)?;
    qb().invoke(name, vec![argument])
}

fn invoke2(name: &str, first: impl IntoSelection, second: impl IntoSelection) -> Result<Expr> {
    let first = qb().resolve(first)?;
    let second = qb().resolve(second)?;
    qb().invoke(name, vec![first, second])
}

fn invoke3(
    name: &str,
    first: impl IntoSelection,
    second: impl IntoSelection,
    third: impl IntoSelection,
) -> Result<Expr> {
    let first = qb().resolve(first)?;
    let second = qb().resolve(second)?;
    let third = qb().resolve(third)?;
    qb().invoke(name, vec![first, second, third])
}

// ---- String ----

pub fn length(text: impl IntoSelection) -> Result<Expr> {
    invoke1("Length", text)
}

pub fn to_upper(text: impl IntoSelection) -> Result<Expr> {
    invoke1("ToUpper", text)
}

pub fn to_lower(text: impl IntoSelection) -> Result<Expr> {
    invoke1("ToLower", text)
}

pub fn trim(text: impl IntoSelection) -> Result<Expr> {
    invoke1("Trim", text)
}

pub fn concat(first: impl IntoSelection, second: impl IntoSelection) -> Result<Expr> {
    invoke2("Concat", first, second)
}

/// One-based `start`, as in the canonical function.
pub fn substring(text: impl IntoSelection, start: impl IntoSelection, length: impl IntoSelection) -> Result<Expr> {
    invoke3("Substring", text, start, length)
}

pub fn contains(text: impl IntoSelection, search: impl IntoSelection) -> Result<Expr> {
    invoke2("Contains", text, search)
}

pub fn starts_with(text: impl IntoSelection, prefix: impl IntoSelection) -> Result<Expr> {
    invoke2("StartsWith", text, prefix)
}

pub fn ends_with(text: impl IntoSelection, suffix: impl IntoSelection) -> Result<Expr> {
    invoke2("EndsWith", text, suffix)
}

/// One-based position of `search` in `text`, 0 when absent.
pub fn index_of(text: impl IntoSelection, search: impl IntoSelection) -> Result<Expr> {
    invoke2("IndexOf", text, search)
}

pub fn left(text: impl IntoSelection, length: impl IntoSelection) -> Result<Expr> {
    invoke2("Left", text, length)
}

pub fn right(text: impl IntoSelection, length: impl IntoSelection) -> Result<Expr> {
    invoke2("Right", text, length)
}

pub fn replace(text: impl IntoSelection, from: impl IntoSelection, to: impl IntoSelection) -> Result<Expr> {
    invoke3("Replace", text, from, to)
}

pub fn reverse(text: impl IntoSelection) -> Result<Expr> {
    invoke1("Reverse", text)
}

pub fn trim_start(text: impl IntoSelection) -> Result<Expr> {
    invoke1("TrimStart", text)
}

pub fn trim_end(text: impl IntoSelection) -> Result<Expr> {
    invoke1("TrimEnd", text)
}

// ---- Math ----

pub fn abs(value: impl IntoSelection) -> Result<Expr> {
    invoke1("Abs", value)
}

pub fn round(value: impl IntoSelection) -> Result<Expr> {
    invoke1("Round", value)
}

pub fn round_to(value: impl IntoSelection, digits: impl IntoSelection) -> Result<Expr> {
    invoke2("Round", value, digits)
}

pub fn floor(value: impl IntoSelection) -> Result<Expr> {
    invoke1("Floor", value)
}

pub fn ceiling(value: impl IntoSelection) -> Result<Expr> {
    invoke1("Ceiling", value)
}

pub fn truncate(value: impl IntoSelection, digits: impl IntoSelection) -> Result<Expr> {
    invoke2("Truncate", value, digits)
}

pub fn power(base: impl IntoSelection, exponent: impl IntoSelection) -> Result<Expr> {
    invoke2("Power", base, exponent)
}

pub fn bitwise_and(left: impl IntoSelection, right: impl IntoSelection) -> Result<Expr> {
    invoke2("BitwiseAnd", left, right)
}

pub fn bitwise_or(left: impl IntoSelection, right: impl IntoSelection) -> Result<Expr> {
    invoke2("BitwiseOr", left, right)
}

pub fn bitwise_xor(left: impl IntoSelection, right: impl IntoSelection) -> Result<Expr> {
    invoke2("BitwiseXor", left, right)
}

pub fn bitwise_not(value: impl IntoSelection) -> Result<Expr> {
    invoke1("BitwiseNot", value)
}

// ---- Date and time ----

pub fn year(date: impl IntoSelection) -> Result<Expr> {
    invoke1("Year", date)
}

pub fn month(date: impl IntoSelection) -> Result<Expr> {
    invoke1("Month", date)
}

pub fn day(date: impl IntoSelection) -> Result<Expr> {
    invoke1("Day", date)
}

pub fn day_of_year(date: impl IntoSelection) -> Result<Expr> {
    invoke1("DayOfYear", date)
}

pub fn hour(time: impl IntoSelection) -> Result<Expr> {
    invoke1("Hour", time)
}

pub fn minute(time: impl IntoSelection) -> Result<Expr> {
    invoke1("Minute", time)
}

pub fn second(time: impl IntoSelection) -> Result<Expr> {
    invoke1("Second", time)
}

pub fn millisecond(time: impl IntoSelection) -> Result<Expr> {
    invoke1("Millisecond", time)
}

pub fn get_total_offset_minutes(date: impl IntoSelection) -> Result<Expr> {
    invoke1("GetTotalOffsetMinutes", date)
}

/// Midnight of the same day.
pub fn truncate_time(date: impl IntoSelection) -> Result<Expr> {
    invoke1("TruncateTime", date)
}

/// Date arithmetic and differences; `unit` is one of `Years`, `Months`, `Days`,
/// `Hours`, `Minutes`, `Seconds`, `Milliseconds`, `Microseconds`, `Nanoseconds`.
pub fn add(unit: &str, value: impl IntoSelection, amount: impl IntoSelection) -> Result<Expr> {
    invoke2(&format!("Add{unit}"), value, amount)
}

pub fn diff(unit: &str, first: impl IntoSelection, second: impl IntoSelection) -> Result<Expr> {
    invoke2(&format!("Diff{unit}"), first, second)
}

pub fn add_days(date: impl IntoSelection, days: impl IntoSelection) -> Result<Expr> {
    add("Days", date, days)
}

pub fn diff_days(first: impl IntoSelection, second: impl IntoSelection) -> Result<Expr> {
    diff("Days", first, second)
}

pub fn create_time(hour: impl IntoSelection, minute: impl IntoSelection, second: impl IntoSelection) -> Result<Expr> {
    invoke3("CreateTime", hour, minute, second)
}

pub fn current_date_time() -> Result<Expr> {
    qb().invoke("CurrentDateTime", Vec::new())
}

pub fn current_utc_date_time() -> Result<Expr> {
    qb().invoke("CurrentUtcDateTime", Vec::new())
}

pub fn current_date_time_offset() -> Result<Expr> {
    qb().invoke("CurrentDateTimeOffset", Vec::new())
}

pub fn new_guid() -> Result<Expr> {
    qb().invoke("NewGuid", Vec::new())
}
