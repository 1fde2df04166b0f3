//! The precedence (dependency) graph of a knowledge base, its strongly
//! connected components, and the set of predicates that bottom-up
//! reasoning cannot decide on its own.
//!
//! There is an edge `p → q` for every rule with a body literal over `p`
//! and a head literal over `q`; the edge is _negative_ if the body
//! literal is. A strongly connected component that contains a negative
//! edge is a cycle through negation: it is not stratifiable, and its
//! predicates (and everything that depends on them) must be guessed by
//! the solver. We call those predicates _over-approximated_.

use std::collections::{BTreeMap, BTreeSet};

use aspify_syntax::*;
use aspify_tracer::*;

/// Vertices are predicates, indexed densely in sorted order.
#[derive(Clone, Debug)]
pub struct PrecedenceGraph {
    vertices: Vec<Predicate>,
    index: BTreeMap<Predicate, usize>,

    /// All successors, positive or negative, without duplicates.
    edges: Vec<Vec<usize>>,

    /// Successors through a negative body literal.
    negative: Vec<Vec<usize>>,
}

impl PrecedenceGraph {
    pub fn new(kb: &KnowledgeBase) -> Self {
        let vertices = kb.predicates().into_iter().collect::<Vec<_>>();
        let index = vertices
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, p)| (p, i))
            .collect::<BTreeMap<_, _>>();

        let mut edges = vec![BTreeSet::new(); vertices.len()];
        let mut negative = vec![BTreeSet::new(); vertices.len()];
        for rule in kb.rules() {
            for body in &rule.body {
                let from = index[&body.predicate()];
                for head in &rule.head {
                    let to = index[&head.predicate()];
                    edges[from].insert(to);
                    if body.is_negative() {
                        negative[from].insert(to);
                    }
                }
            }
        }

        let flatten = |sets: Vec<BTreeSet<usize>>| {
            sets.into_iter()
                .map(|s| s.into_iter().collect())
                .collect::<Vec<Vec<usize>>>()
        };
        Self {
            vertices,
            index,
            edges: flatten(edges),
            negative: flatten(negative),
        }
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.vertices.iter()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// All predicates with an edge from `p`.
    pub fn successors(&self, p: &Predicate) -> impl Iterator<Item = &Predicate> {
        self.index
            .get(p)
            .into_iter()
            .flat_map(|&i| self.edges[i].iter().map(|&j| &self.vertices[j]))
    }

    /// All predicates with a negative edge from `p`.
    pub fn negative_successors(&self, p: &Predicate) -> impl Iterator<Item = &Predicate> {
        self.index
            .get(p)
            .into_iter()
            .flat_map(|&i| self.negative[i].iter().map(|&j| &self.vertices[j]))
    }

    /// Tarjan's algorithm with an explicit call stack, so that deep
    /// dependency chains can't overflow the native one. Components are
    /// returned in the order they are completed, which is a reverse
    /// topological order: every component comes before the components
    /// with edges into it.
    fn tarjan(&self) -> Vec<Vec<usize>> {
        const UNVISITED: usize = usize::MAX;
        let n = self.vertices.len();
        let mut index = vec![UNVISITED; n];
        let mut lowlink = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut components = Vec::new();
        let mut counter = 0;

        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }
            // Frames are (vertex, index of the next successor to try).
            let mut calls = vec![(root, 0)];
            index[root] = counter;
            lowlink[root] = counter;
            counter += 1;
            stack.push(root);
            on_stack[root] = true;

            while let Some(&(v, next)) = calls.last() {
                if let Some(&w) = self.edges[v].get(next) {
                    let top = calls.len() - 1;
                    calls[top].1 += 1;
                    if index[w] == UNVISITED {
                        index[w] = counter;
                        lowlink[w] = counter;
                        counter += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        calls.push((w, 0));
                    } else if on_stack[w] {
                        lowlink[v] = lowlink[v].min(index[w]);
                    }
                } else {
                    calls.pop();
                    if let Some(&(u, _)) = calls.last() {
                        lowlink[u] = lowlink[u].min(lowlink[v]);
                    }
                    if lowlink[v] == index[v] {
                        let mut component = Vec::new();
                        while let Some(w) = stack.pop() {
                            on_stack[w] = false;
                            component.push(w);
                            if w == v {
                                break;
                            }
                        }
                        components.push(component);
                    }
                }
            }
        }
        components
    }

    /// The strongly connected components, in reverse topological order.
    pub fn components(&self) -> Vec<BTreeSet<Predicate>> {
        self.tarjan()
            .into_iter()
            .map(|c| c.into_iter().map(|i| self.vertices[i].clone()).collect())
            .collect()
    }
}

/// The result of analyzing a knowledge base's precedence graph.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Analysis {
    /// Strongly connected components, numbered by discovery.
    pub components: BTreeMap<usize, BTreeSet<Predicate>>,

    /// Closed under successors: if `p` is in here and `p → q`, so is `q`.
    pub approximated: BTreeSet<Predicate>,
}

impl Analysis {
    pub fn new(kb: &KnowledgeBase, trace: Trace) -> Self {
        Self::from_graph(&PrecedenceGraph::new(kb), trace)
    }

    pub fn from_graph(graph: &PrecedenceGraph, trace: Trace) -> Self {
        let components = graph
            .components()
            .into_iter()
            .enumerate()
            .collect::<BTreeMap<_, _>>();

        // Seed with the components that contain a negative cycle,
        // together with the targets of their negative edges.
        let mut approximated = BTreeSet::new();
        for (i, component) in &components {
            let targets = component
                .iter()
                .flat_map(|p| graph.negative_successors(p))
                .cloned()
                .collect::<BTreeSet<_>>();
            if !targets.is_disjoint(component) {
                trace!(
                    trace,
                    Analyze,
                    "Component {i} has a negative cycle: {{{}}}",
                    format_predicates(component)
                );
                approximated.extend(component.iter().cloned());
                approximated.extend(targets);
            }
        }

        // Close under successors.
        let mut pending = approximated.iter().cloned().collect::<Vec<_>>();
        while let Some(p) = pending.pop() {
            for q in graph.successors(&p) {
                if approximated.insert(q.clone()) {
                    pending.push(q.clone());
                }
            }
        }

        trace!(
            trace,
            Analyze,
            "Over-approximated predicates: {{{}}}",
            format_predicates(&approximated)
        );
        Self {
            components,
            approximated,
        }
    }

    pub fn is_approximated(&self, p: &Predicate) -> bool {
        self.approximated.contains(p)
    }

    /// The number of the component containing `p`.
    pub fn component_of(&self, p: &Predicate) -> Option<usize> {
        self.components
            .iter()
            .find_map(|(&i, c)| c.contains(p).then_some(i))
    }
}

fn format_predicates<'a>(predicates: impl IntoIterator<Item = &'a Predicate>) -> String {
    predicates
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod test {
    use super::*;

    fn analyze(text: &str) -> Analysis {
        Analysis::new(&parse_program(text).expect("parse"), Trace::none())
    }

    fn preds(names: &[&str]) -> BTreeSet<Predicate> {
        names.iter().map(|n| Predicate::new(*n, 0)).collect()
    }

    fn component(analysis: &Analysis, name: &str) -> BTreeSet<Predicate> {
        let i = analysis
            .component_of(&Predicate::new(name, 0))
            .expect("no component");
        analysis.components[&i].clone()
    }

    #[test]
    fn positive_cycle() {
        let analysis = analyze("p1 :- p2. p2 :- p1.");
        assert_eq!(component(&analysis, "p1"), preds(&["p1", "p2"]));
        assert!(analysis.approximated.is_empty());
    }

    #[test]
    fn negative_cycle() {
        let analysis = analyze("q1 :- q3, not q2. q2 :- q3. q3 :- q1, q2.");
        assert_eq!(component(&analysis, "q1"), preds(&["q1", "q2", "q3"]));
        assert_eq!(analysis.approximated, preds(&["q1", "q2", "q3"]));
    }

    #[test]
    fn closure() {
        let analysis = analyze(
            "p1 :- p2. p2 :- p1.
             q1 :- q3, not q2. q2 :- q3. q3 :- q1, q2.
             r1 :- p1, p2, q3.",
        );
        assert_eq!(component(&analysis, "r1"), preds(&["r1"]));
        assert!(analysis.is_approximated(&Predicate::new("r1", 0)));
        assert!(!analysis.is_approximated(&Predicate::new("p1", 0)));
        assert_eq!(analysis.approximated, preds(&["q1", "q2", "q3", "r1"]));
    }

    #[test]
    fn self_loop() {
        let analysis = analyze("s1 :- not s2, s1. s2 :- s1.");
        assert_eq!(analysis.approximated, preds(&["s1", "s2"]));
    }

    #[test]
    fn negative_self_loop() {
        let analysis = analyze("a :- not a.");
        assert_eq!(analysis.approximated, preds(&["a"]));
    }

    #[test]
    fn fact_only() {
        let analysis = analyze("t1. u :- t1, not v. v :- t1.");
        assert_eq!(component(&analysis, "t1"), preds(&["t1"]));
        assert!(analysis.approximated.is_empty());
        assert_eq!(analysis.components.len(), 3);
    }

    #[test]
    fn arity_matters() {
        let analysis = analyze("p(X) :- q(X), not p(X, X). p(X, Y) :- q(X), q(Y).");
        assert!(analysis.approximated.is_empty());
    }

    #[test]
    fn closure_is_closed() {
        let kb = parse_program(
            "a :- not b. b :- not a. c :- a. d :- c, e. e. f :- e, not d. g :- e.",
        )
        .expect("parse");
        let graph = PrecedenceGraph::new(&kb);
        let analysis = Analysis::from_graph(&graph, Trace::none());
        for p in &analysis.approximated {
            for q in graph.successors(p) {
                assert!(analysis.is_approximated(q), "{p} → {q} escapes");
            }
        }
        assert_eq!(analysis.approximated, preds(&["a", "b", "c", "d", "f"]));
    }

    #[test]
    fn reverse_topological() {
        let kb = parse_program("b :- a. c :- b. d :- c, not a.").expect("parse");
        let graph = PrecedenceGraph::new(&kb);
        let order = graph
            .components()
            .into_iter()
            .flat_map(|c| c.into_iter())
            .map(|p| p.name.name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn long_chain() {
        let text = (0..10_000)
            .map(|i| format!("p{} :- p{}.", i + 1, i))
            .collect::<String>();
        let kb = parse_program(&format!("{text} p0 :- p10000.")).expect("parse");
        let components = PrecedenceGraph::new(&kb).components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 10_001);
    }
}
