//! Branch labels.

use std::collections::{HashMap, VecDeque};

use miette::Result;
use nolog::*;

use super::{aarch64::Label, error::CodegenError};
use crate::ast::{
    visit::{collect_cases, collect_labels, CaseLabel},
    Block, Spanned,
};

/// Issues fresh numbered labels. Numbers are unique within one function.
#[derive(Debug, Default)]
pub struct LabelGen {
    next: u32,
}

impl LabelGen {
    /// Create a generator starting from `.L0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh label.
    pub fn fresh(&mut self) -> Label {
        let label = Label::Tag(self.next);
        self.next += 1;
        trace!("LABEL " => "reserve {}", label);
        label
    }
}

/// User `goto` labels of a function, mapped to assembly labels.
#[derive(Debug, Default)]
pub struct GotoLabels {
    labels: HashMap<String, Label>,
}

impl GotoLabels {
    /// Reserve a label for every labelled statement in `body`.
    pub fn collect(body: &Block, gen: &mut LabelGen) -> Result<Self> {
        let mut labels = HashMap::new();
        for name in collect_labels(body) {
            if labels.contains_key(&name.node) {
                return Err(CodegenError::DuplicateDeclaration {
                    name: name.node.clone(),
                    span: Some(name.span().into()),
                }
                .into());
            }
            labels.insert(name.node.clone(), gen.fresh());
        }
        Ok(Self { labels })
    }

    /// Label for the user label `name`.
    pub fn get(&self, name: &str) -> Option<Label> {
        self.labels.get(name).copied()
    }
}

/// Dispatch targets of one switch, in source order of the case labels.
#[derive(Debug)]
pub struct CaseTable {
    entries: Vec<(CaseLabel, Label)>,
    /// Labels not yet placed, consumed as the body is emitted.
    pending: VecDeque<Label>,
}

impl CaseTable {
    /// Reserve a label for every `case`/`default` owned by the switch `body`.
    pub fn collect(body: &Block, gen: &mut LabelGen) -> Self {
        let entries: Vec<_> = collect_cases(body)
            .into_iter()
            .map(|case| (case.node, gen.fresh()))
            .collect();
        let pending = entries.iter().map(|&(_, label)| label).collect();
        Self { entries, pending }
    }

    /// `case` values with their labels.
    pub fn cases(&self) -> impl Iterator<Item = (i64, Label)> + '_ {
        self.entries.iter().filter_map(|&(case, label)| match case {
            CaseLabel::Case(value) => Some((value, label)),
            CaseLabel::Default => None,
        })
    }

    /// Label of `default`, if present.
    pub fn default_label(&self) -> Option<Label> {
        self.entries
            .iter()
            .find(|(case, _)| *case == CaseLabel::Default)
            .map(|&(_, label)| label)
    }

    /// Label of the next case label reached while emitting the body.
    pub fn next_pending(&mut self) -> Option<Label> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn fresh_labels_are_distinct() {
        let mut gen = LabelGen::new();
        assert_eq!(gen.fresh(), Label::Tag(0));
        assert_eq!(gen.fresh(), Label::Tag(1));
    }

    #[test]
    fn case_table_order() {
        let program = parse(
            "int main() { int x = 0; switch (x) { case 3: default: case -1: break; } return 0; }",
        )
        .unwrap();
        let body = &program.function.unwrap().body;
        let switch_body = body
            .items
            .iter()
            .find_map(|item| match item {
                crate::ast::BlockItem::Stmt(crate::ast::Stmt::Switch { body, .. }) => Some(body),
                _ => None,
            })
            .unwrap();

        let mut gen = LabelGen::new();
        gen.fresh();
        let mut table = CaseTable::collect(switch_body, &mut gen);
        let cases: Vec<_> = table.cases().collect();
        assert_eq!(cases, [(3, Label::Tag(1)), (-1, Label::Tag(3))]);
        assert_eq!(table.default_label(), Some(Label::Tag(2)));
        assert_eq!(table.next_pending(), Some(Label::Tag(1)));
        assert_eq!(table.next_pending(), Some(Label::Tag(2)));
        assert_eq!(table.next_pending(), Some(Label::Tag(3)));
        assert_eq!(table.next_pending(), None);
    }

    #[test]
    fn goto_labels() {
        let program = parse("int main() { a: goto b; b: return 0; }").unwrap();
        let mut gen = LabelGen::new();
        let labels = GotoLabels::collect(&program.function.unwrap().body, &mut gen).unwrap();
        assert_eq!(labels.get("a"), Some(Label::Tag(0)));
        assert_eq!(labels.get("b"), Some(Label::Tag(1)));
        assert_eq!(labels.get("c"), None);
    }
}
