//! OData query construction for Microsoft Graph list endpoints
//!
//! Graph rejects a `$filter` + `$orderby` combination ("InefficientFilter: the
//! restriction or sort order is too complex") unless every `$orderby` property
//! is also filtered, those predicates come first, and they appear in the same
//! order as in `$orderby`. [`QueryBuilder`] emits predicates in that order by
//! construction.

use crate::odata::escape::escape_odata_string;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction for `$orderby`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A single boolean predicate of a `$filter` expression.
///
/// `name` is the logical filter it came from ("since", "sender", ...), `field`
/// the property it constrains. Values interpolated through the constructors
/// below are escaped here; callers pass raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    name: String,
    field: String,
    expression: String,
}

impl Predicate {
    /// Predicate with a caller-built expression. The expression must not
    /// contain unescaped user input.
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            expression: expression.into(),
        }
    }

    /// `field eq 'value'`
    pub fn equals(name: impl Into<String>, field: &str, value: &str) -> Self {
        Self::new(
            name,
            field,
            format!("{} eq '{}'", field, escape_odata_string(value)),
        )
    }

    /// `contains(field, 'value')`
    pub fn contains(name: impl Into<String>, field: &str, value: &str) -> Self {
        Self::new(
            name,
            field,
            format!("contains({}, '{}')", field, escape_odata_string(value)),
        )
    }

    /// `(field eq 'a' or field eq 'b' ...)`
    pub fn any_of<S: AsRef<str>>(name: impl Into<String>, field: &str, values: &[S]) -> Self {
        let alternatives = values
            .iter()
            .map(|v| format!("{} eq '{}'", field, escape_odata_string(v.as_ref())))
            .collect::<Vec<_>>()
            .join(" or ");
        Self::new(name, field, format!("({})", alternatives))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

#[derive(Debug, Clone)]
struct OrderField {
    field: String,
    direction: SortDirection,
    /// Always-true predicate used when the caller did not filter on `field`.
    fallback: Option<String>,
}

/// Builder for a constraint-satisfying [`QueryDescriptor`]
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    order: Vec<OrderField>,
    predicates: Vec<Predicate>,
    select: Vec<String>,
    expand: Vec<String>,
    top: Option<u32>,
    max_top: Option<u32>,
    skiptoken: Option<PageCursor>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by `field`. Predicates on `field` are still placed first, but
    /// nothing is synthesized when none are supplied.
    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order.push(OrderField {
            field: field.to_string(),
            direction,
            fallback: None,
        });
        self
    }

    /// Sort by `field` on an endpoint that requires the sort property to be
    /// filtered. `fallback` is emitted when no predicate on `field` is supplied.
    pub fn order_by_filtered(
        mut self,
        field: &str,
        direction: SortDirection,
        fallback: impl Into<String>,
    ) -> Self {
        self.order.push(OrderField {
            field: field.to_string(),
            direction,
            fallback: Some(fallback.into()),
        });
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add the predicate produced by `make` only when `condition` holds.
    pub fn predicate_if(self, condition: bool, make: impl FnOnce() -> Predicate) -> Self {
        if condition {
            self.predicate(make())
        } else {
            self
        }
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn expand(mut self, navigation: &str) -> Self {
        self.expand.push(navigation.to_string());
        self
    }

    /// Page size. Any positive value is accepted; see [`QueryBuilder::max_top`].
    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    /// Documented maximum page size of the endpoint; `$top` is clamped to it.
    pub fn max_top(mut self, max: u32) -> Self {
        self.max_top = Some(max);
        self
    }

    /// Continue from a previously issued cursor.
    pub fn skiptoken(mut self, cursor: Option<PageCursor>) -> Self {
        self.skiptoken = cursor;
        self
    }

    /// The `$filter` expression: predicates on each `$orderby` field first (in
    /// `$orderby` order, caller order within a field), then all others.
    pub fn filter_expression(&self) -> Option<String> {
        let mut ordered: Vec<&str> = Vec::with_capacity(self.predicates.len() + self.order.len());

        for order in &self.order {
            let mut matched = false;
            for predicate in self.predicates.iter().filter(|p| p.field == order.field) {
                ordered.push(&predicate.expression);
                matched = true;
            }
            if !matched {
                if let Some(ref fallback) = order.fallback {
                    ordered.push(fallback);
                }
            }
        }

        for predicate in &self.predicates {
            if !self.order.iter().any(|o| o.field == predicate.field) {
                ordered.push(&predicate.expression);
            }
        }

        if ordered.is_empty() {
            None
        } else {
            Some(ordered.join(" and "))
        }
    }

    pub fn build(&self) -> QueryDescriptor {
        let orderby = if self.order.is_empty() {
            None
        } else {
            Some(
                self.order
                    .iter()
                    .map(|o| format!("{} {}", o.field, o.direction.as_str()))
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };

        let top = self.top.map(|top| {
            let top = top.max(1);
            match self.max_top {
                Some(max) => top.min(max),
                None => top,
            }
        });

        QueryDescriptor {
            filter: self.filter_expression(),
            orderby,
            top,
            select: (!self.select.is_empty()).then(|| self.select.join(",")),
            expand: (!self.expand.is_empty()).then(|| self.expand.join(",")),
            skiptoken: self.skiptoken.as_ref().map(|c| c.as_str().to_string()),
        }
    }
}

/// Finished OData query parameters for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub filter: Option<String>,
    pub orderby: Option<String>,
    pub top: Option<u32>,
    pub select: Option<String>,
    pub expand: Option<String>,
    pub skiptoken: Option<String>,
}

impl QueryDescriptor {
    /// Query parameters as unencoded name/value pairs
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(ref select) = self.select {
            params.push(("$select".to_string(), select.clone()));
        }

        if let Some(ref expand) = self.expand {
            params.push(("$expand".to_string(), expand.clone()));
        }

        if let Some(ref filter) = self.filter {
            params.push(("$filter".to_string(), filter.clone()));
        }

        if let Some(ref orderby) = self.orderby {
            params.push(("$orderby".to_string(), orderby.clone()));
        }

        if let Some(top) = self.top {
            params.push(("$top".to_string(), top.to_string()));
        }

        if let Some(ref token) = self.skiptoken {
            params.push(("$skiptoken".to_string(), token.clone()));
        }

        params
    }
}

/// Opaque continuation token: the `$skiptoken` of an `@odata.nextLink`.
///
/// Validity is owned by Graph; the cursor is never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Extract the `$skiptoken` parameter from a next-link URL.
    /// A malformed link or one without a token means there are no more pages.
    pub fn from_next_link(next_link: &str) -> Option<Self> {
        let url = Url::parse(next_link).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "$skiptoken")
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty())
            .map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// One page of a Graph collection response
#[derive(Debug, Deserialize)]
pub struct GraphPage<T = Value> {
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,

    #[serde(default)]
    pub value: Vec<T>,
}

impl<T> GraphPage<T> {
    pub fn has_more(&self) -> bool {
        self.next_link.is_some()
    }

    pub fn next_token(&self) -> Option<PageCursor> {
        self.next_link
            .as_deref()
            .and_then(PageCursor::from_next_link)
    }
}
