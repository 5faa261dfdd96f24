//! Recursive walk over field values looking for links.
//!
//! Discovery reads links with [`VisitLinks`]; relinking rewrites them in place
//! with [`VisitLinksMut`]. Both descend through nested lists and skip scalars,
//! so call sites never inspect value shapes themselves.

use super::{FieldValue, Fields, Link};

/// Read-only traversal of every [`Link`] reachable from a value.
pub trait VisitLinks {
    /// Call `f` for each link, depth first, in list order.
    fn visit_links<F: FnMut(&Link)>(&self, f: &mut F);
}

/// Mutable traversal of every [`Link`] reachable from a value.
pub trait VisitLinksMut {
    /// Call `f` for each link, depth first, in list order.
    fn visit_links_mut<F: FnMut(&mut Link)>(&mut self, f: &mut F);
}

impl VisitLinks for FieldValue {
    fn visit_links<F: FnMut(&Link)>(&self, f: &mut F) {
        match self {
            Self::Link(link) => f(link),
            Self::List(items) => {
                for item in items {
                    item.visit_links(f);
                }
            }
            Self::Scalar(_) => {}
        }
    }
}

impl VisitLinksMut for FieldValue {
    fn visit_links_mut<F: FnMut(&mut Link)>(&mut self, f: &mut F) {
        match self {
            Self::Link(link) => f(link),
            Self::List(items) => {
                for item in items {
                    item.visit_links_mut(f);
                }
            }
            Self::Scalar(_) => {}
        }
    }
}

impl VisitLinks for Fields {
    fn visit_links<F: FnMut(&Link)>(&self, f: &mut F) {
        for value in self.values() {
            value.visit_links(f);
        }
    }
}

impl VisitLinksMut for Fields {
    fn visit_links_mut<F: FnMut(&mut Link)>(&mut self, f: &mut F) {
        for value in self.values_mut() {
            value.visit_links_mut(f);
        }
    }
}
