//! `spec.md` §6 Filter API: `accept(visitor)` — a double-dispatch visitor
//! over the filter tree, matched on the sum type rather than dynamic
//! dispatch per node (§9 design note: "Visitor over filter trees → match on
//! sum type").

use crate::ast::{Filter, PropertyFilter};

pub trait FilterVisitor {
    fn visit_open(&mut self) {}
    fn visit_closed(&mut self) {}
    fn visit_compare(&mut self, compare: &PropertyFilter) {}
    fn visit_and(&mut self, left: &Filter, right: &Filter) {
        left.accept(self);
        right.accept(self);
    }
    fn visit_or(&mut self, left: &Filter, right: &Filter) {
        left.accept(self);
        right.accept(self);
    }
    fn visit_not(&mut self, inner: &Filter) { inner.accept(self); }
}

impl Filter {
    pub fn accept<V: FilterVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Filter::Open => visitor.visit_open(),
            Filter::Closed => visitor.visit_closed(),
            Filter::Compare(pf) => visitor.visit_compare(pf),
            Filter::And(l, r) => visitor.visit_and(l, r),
            Filter::Or(l, r) => visitor.visit_or(l, r),
            Filter::Not(inner) => visitor.visit_not(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PropertyFilter;

    #[derive(Default)]
    struct CountingVisitor {
        compares: usize,
    }

    impl FilterVisitor for CountingVisitor {
        fn visit_compare(&mut self, _compare: &PropertyFilter) { self.compares += 1; }
    }

    #[test]
    fn visitor_walks_every_leaf() {
        let f = Filter::Compare(PropertyFilter::eq("a", 1))
            .and(Filter::Compare(PropertyFilter::eq("b", 2)))
            .or(Filter::Compare(PropertyFilter::eq("c", 3)));
        let mut v = CountingVisitor::default();
        f.accept(&mut v);
        assert_eq!(v.compares, 3);
    }
}
