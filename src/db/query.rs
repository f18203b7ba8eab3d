use std::collections::HashMap;
use std::str::FromStr;

use sea_orm::sea_query::Order;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select, Value};

/// Query-string keys consumed by the pipeline itself; everything else is a
/// candidate filter field.
const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

const DEFAULT_LIMIT: u64 = 100;

/// Per-resource allow-lists for the query pipeline. Only fields named here
/// can be filtered, sorted, or projected; for users this is what keeps the
/// password columns unreachable.
#[derive(Debug, Clone, Copy)]
pub struct ResourceQuerySpec {
    pub filterable: &'static [&'static str],
    pub sortable: &'static [&'static str],
    pub selectable: &'static [&'static str],
    /// Applied when no `sort` parameter is given; `-` prefix for descending.
    pub default_sort: &'static str,
}

/// Raw query-string map as received at the HTTP boundary.
#[derive(Debug, Clone, Default)]
pub struct ListParams(pub HashMap<String, String>);

impl ListParams {
    #[must_use]
    pub fn new(raw: HashMap<String, String>) -> Self {
        Self(raw)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// 1-based page, defaulting rather than failing on garbage.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.get("page")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.get("limit")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
    }
}

enum FilterOp {
    Eq,
    Gte,
    Gt,
    Lte,
    Lt,
}

/// Split `views[gte]` into `("views", Gte)`; a bare key is equality.
/// Unknown operators are dropped entirely.
fn parse_filter_key(key: &str) -> Option<(&str, FilterOp)> {
    match key.split_once('[') {
        None => Some((key, FilterOp::Eq)),
        Some((field, rest)) => {
            let op = match rest.strip_suffix(']')? {
                "gte" => FilterOp::Gte,
                "gt" => FilterOp::Gt,
                "lte" => FilterOp::Lte,
                "lt" => FilterOp::Lt,
                _ => return None,
            };
            Some((field, op))
        }
    }
}

/// Type a raw query value by parse attempt so numeric comparisons compare
/// numbers, not strings.
fn typed_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return n.into();
    }
    if let Ok(b) = raw.parse::<bool>() {
        return b.into();
    }
    raw.into()
}

/// Apply filter, sort, field selection, and pagination to a `Select`, in
/// that fixed order (pagination must come last). The pipeline itself never
/// errors: unknown fields and malformed values are skipped or defaulted so
/// listing endpoints stay available.
pub fn apply_features<E>(
    mut select: Select<E>,
    params: &ListParams,
    spec: &ResourceQuerySpec,
) -> Select<E>
where
    E: EntityTrait,
    E::Column: FromStr,
{
    // 1) Filter: every non-reserved key in the filterable allow-list.
    for (key, raw) in &params.0 {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let Some((field, op)) = parse_filter_key(key) else {
            continue;
        };
        if !spec.filterable.contains(&field) {
            continue;
        }
        let Ok(col) = E::Column::from_str(field) else {
            continue;
        };
        let value = typed_value(raw);
        select = match op {
            FilterOp::Eq => select.filter(col.eq(value)),
            FilterOp::Gte => select.filter(col.gte(value)),
            FilterOp::Gt => select.filter(col.gt(value)),
            FilterOp::Lte => select.filter(col.lte(value)),
            FilterOp::Lt => select.filter(col.lt(value)),
        };
    }

    // 2) Sort: comma-separated, `-` prefix descending, left-to-right.
    let sort_expr = params.get("sort").unwrap_or(spec.default_sort);
    for part in sort_expr.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (field, order) = match part.strip_prefix('-') {
            Some(f) => (f, Order::Desc),
            None => (part, Order::Asc),
        };
        if !spec.sortable.contains(&field) {
            continue;
        }
        if let Ok(col) = E::Column::from_str(field) {
            select = select.order_by(col, order);
        }
    }
    // Tie-break on the primary key so pagination slices never overlap when
    // the requested sort key has duplicates.
    if let Ok(id_col) = E::Column::from_str("id") {
        select = select.order_by(id_col, Order::Desc);
    }

    // 3) Field selection: requested fields intersected with the selectable
    //    allow-list; absent (or fully unknown) means all selectable columns.
    let requested: Vec<&str> = params
        .get("fields")
        .map(|f| {
            f.split(',')
                .map(str::trim)
                .filter(|name| spec.selectable.contains(name))
                .collect()
        })
        .unwrap_or_default();
    let projection: &[&str] = if requested.is_empty() {
        spec.selectable
    } else {
        &requested
    };
    select = select.select_only();
    for field in projection {
        if let Ok(col) = E::Column::from_str(field) {
            select = select.column(col);
        }
    }

    // 4) Paginate: offset = (page-1)*limit, saturating so an absurd page
    //    number is just an empty result instead of an overflow.
    let limit = params.limit();
    let offset = params.page().saturating_sub(1).saturating_mul(limit);
    select.offset(offset).limit(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::prelude::*;
    use sea_orm::{DbBackend, QueryTrait};

    const BLOG_SPEC: ResourceQuerySpec = ResourceQuerySpec {
        filterable: &["category", "blog_type", "views", "author_id"],
        sortable: &["created_at", "views", "heading"],
        selectable: &["id", "heading", "description", "views", "created_at"],
        default_sort: "-created_at",
    };

    fn sql(params: &[(&str, &str)]) -> String {
        let map: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        apply_features(Blogs::find(), &ListParams::new(map), &BLOG_SPEC)
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn comparison_operator_translates_to_relational_constraint() {
        let sql = sql(&[("views[gte]", "5")]);
        assert!(sql.contains(r#""blogs"."views" >= 5"#), "{sql}");
    }

    #[test]
    fn plain_key_is_equality() {
        let sql = sql(&[("category", "Science")]);
        assert!(sql.contains(r#""blogs"."category" = 'Science'"#), "{sql}");
    }

    #[test]
    fn reserved_and_unknown_keys_are_not_filters() {
        let sql = sql(&[("page", "2"), ("password_hash", "x"), ("bogus[gte]", "1")]);
        assert!(!sql.contains("page"), "{sql}");
        assert!(!sql.contains("password_hash"), "{sql}");
        assert!(!sql.contains("bogus"), "{sql}");
    }

    #[test]
    fn unknown_operator_is_dropped() {
        let sql = sql(&[("views[ne]", "5")]);
        assert!(!sql.contains("WHERE"), "{sql}");
    }

    #[test]
    fn default_sort_is_created_at_descending() {
        let sql = sql(&[]);
        assert!(sql.contains(r#"ORDER BY "blogs"."created_at" DESC"#), "{sql}");
    }

    #[test]
    fn compound_sort_applies_left_to_right() {
        let sql = sql(&[("sort", "-views,heading")]);
        let views_pos = sql.find(r#""blogs"."views" DESC"#).unwrap();
        let heading_pos = sql.find(r#""blogs"."heading" ASC"#).unwrap();
        assert!(views_pos < heading_pos, "{sql}");
    }

    #[test]
    fn pagination_computes_offset_from_one_based_page() {
        let sql = sql(&[("page", "3"), ("limit", "10")]);
        assert!(sql.contains("LIMIT 10"), "{sql}");
        assert!(sql.contains("OFFSET 20"), "{sql}");
    }

    #[test]
    fn extreme_page_value_saturates_instead_of_overflowing() {
        let sql = sql(&[("page", "18446744073709551615"), ("limit", "100")]);
        assert!(sql.contains("LIMIT 100"), "{sql}");
        assert!(sql.contains(&format!("OFFSET {}", u64::MAX)), "{sql}");
    }

    #[test]
    fn malformed_page_and_limit_default_instead_of_failing() {
        let sql = sql(&[("page", "zero"), ("limit", "-3")]);
        assert!(sql.contains("LIMIT 100"), "{sql}");
        assert!(sql.contains("OFFSET 0"), "{sql}");
    }

    #[test]
    fn field_selection_projects_requested_columns_only() {
        let sql = sql(&[("fields", "heading,views")]);
        assert!(sql.contains(r#""blogs"."heading""#), "{sql}");
        assert!(sql.contains(r#""blogs"."views""#), "{sql}");
        assert!(!sql.contains(r#""blogs"."content""#), "{sql}");
    }

    #[test]
    fn fields_outside_allow_list_are_ignored() {
        let sql = sql(&[("fields", "content,heading")]);
        assert!(!sql.contains(r#""blogs"."content""#), "{sql}");
        assert!(sql.contains(r#""blogs"."heading""#), "{sql}");
    }

    #[test]
    fn absent_fields_param_selects_all_selectable_columns() {
        let sql = sql(&[]);
        for field in BLOG_SPEC.selectable {
            assert!(sql.contains(&format!(r#""blogs"."{field}""#)), "{sql}");
        }
        assert!(!sql.contains(r#""blogs"."content""#), "{sql}");
    }
}
