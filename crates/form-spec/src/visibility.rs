use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::answers::ValueStore;
use crate::expr::{Expr, FieldLookup, Lookup};
use crate::spec::field::FieldId;
use crate::spec::form::FormSpec;

pub type VisibilityMap = BTreeMap<FieldId, bool>;

#[derive(Debug, Clone)]
enum Rule {
    Always,
    Condition(Expr),
    /// The condition did not compile; the field stays visible.
    Broken,
}

/// Visibility conditions of one schema, compiled once and evaluated per change.
#[derive(Debug, Clone)]
pub struct VisibilityEngine {
    order: Vec<FieldId>,
    labels: HashMap<String, FieldId>,
    rules: HashMap<FieldId, Rule>,
    dependencies: HashMap<FieldId, Vec<FieldId>>,
    cyclic: BTreeSet<FieldId>,
}

impl VisibilityEngine {
    pub fn new(form: &FormSpec) -> Self {
        let mut labels = HashMap::new();
        for field in form.fields().filter(|field| !field.label.trim().is_empty()) {
            labels
                .entry(field.label.clone())
                .or_insert_with(|| field.id.clone());
        }

        let mut order = Vec::new();
        let mut rules = HashMap::new();
        let mut dependencies = HashMap::new();
        for field in form.fields() {
            order.push(field.id.clone());
            let rule = match field.active_condition() {
                None => Rule::Always,
                Some(source) => match Expr::parse(source, |label| labels.contains_key(label)) {
                    Ok(expr) => {
                        let deps = expr
                            .field_labels()
                            .into_iter()
                            .filter_map(|label| labels.get(label).cloned())
                            .collect::<Vec<_>>();
                        dependencies.insert(field.id.clone(), deps);
                        Rule::Condition(expr)
                    }
                    Err(err) => {
                        warn!(
                            field = %field.id,
                            condition = source,
                            error = %err,
                            "visibility condition does not compile; field stays visible"
                        );
                        Rule::Broken
                    }
                },
            };
            rules.insert(field.id.clone(), rule);
        }

        let mut engine = Self {
            order,
            labels,
            rules,
            dependencies,
            cyclic: BTreeSet::new(),
        };
        let cyclic = engine
            .order
            .iter()
            .filter(|id| engine.on_cycle(id))
            .cloned()
            .collect();
        engine.cyclic = cyclic;
        for id in &engine.cyclic {
            warn!(field = %id, "visibility condition is cyclic; field stays visible");
        }
        engine
    }

    /// Fields whose condition depends on their own visibility, in schema order.
    pub fn cyclic_fields(&self) -> impl Iterator<Item = &FieldId> {
        self.order.iter().filter(|id| self.cyclic.contains(*id))
    }

    pub fn has_condition(&self, id: &FieldId) -> bool {
        !matches!(self.rules.get(id), None | Some(Rule::Always))
    }

    /// Visibility of every field for the given live values.
    pub fn resolve(&self, values: &ValueStore) -> VisibilityMap {
        let mut memo = HashMap::new();
        for id in &self.order {
            self.visible(id, values, &mut memo);
        }
        self.order
            .iter()
            .map(|id| (id.clone(), memo.get(id).copied().unwrap_or(true)))
            .collect()
    }

    fn visible(&self, id: &FieldId, values: &ValueStore, memo: &mut HashMap<FieldId, bool>) -> bool {
        if let Some(visible) = memo.get(id) {
            return *visible;
        }
        let visible = if self.cyclic.contains(id) {
            true
        } else {
            match self.rules.get(id) {
                Some(Rule::Condition(expr)) => {
                    if let Some(deps) = self.dependencies.get(id) {
                        for dep in deps {
                            self.visible(dep, values, memo);
                        }
                    }
                    let ctx = ResolveContext {
                        labels: &self.labels,
                        values,
                        visibility: memo,
                    };
                    match expr.evaluate(&ctx) {
                        Ok(visible) => visible,
                        Err(err) => {
                            debug!(field = %id, error = %err, "visibility evaluation failed; field stays visible");
                            true
                        }
                    }
                }
                _ => true,
            }
        };
        memo.insert(id.clone(), visible);
        visible
    }

    fn on_cycle(&self, start: &FieldId) -> bool {
        let mut stack: Vec<&FieldId> = self.deps(start).iter().collect();
        let mut seen = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == start {
                return true;
            }
            if seen.insert(node) {
                stack.extend(self.deps(node));
            }
        }
        false
    }

    fn deps(&self, id: &FieldId) -> &[FieldId] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Label lookup that treats hidden fields as unanswered.
struct ResolveContext<'a> {
    labels: &'a HashMap<String, FieldId>,
    values: &'a ValueStore,
    visibility: &'a HashMap<FieldId, bool>,
}

impl FieldLookup for ResolveContext<'_> {
    fn lookup(&self, label: &str) -> Lookup<'_> {
        let Some(id) = self.labels.get(label) else {
            return Lookup::Unknown;
        };
        if !self.visibility.get(id).copied().unwrap_or(true) {
            return Lookup::Absent;
        }
        match self.values.get(id) {
            Some(value) => Lookup::Value(value),
            None => Lookup::Absent,
        }
    }
}

/// One-shot visibility for a schema and answer set.
pub fn resolve_visibility(form: &FormSpec, values: &ValueStore) -> VisibilityMap {
    VisibilityEngine::new(form).resolve(values)
}
