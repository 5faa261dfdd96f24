//! Invariants of a clone over random link graphs.

use std::collections::{BTreeSet, HashMap, VecDeque};

use deepcopy_cli::models::EntryId;
use deepcopy_cli::pipeline::{CloneOptions, Cloner};
use deepcopy_cli::test_utils::{GraphBuilder, InMemoryCmsClient};
use proptest::prelude::*;

const COPIED_TYPES: [&str; 3] = ["contentModule", "toolkitAsset", "imageMetadata"];
const SHARED_TYPE: &str = "tagRegion";

#[derive(Debug, Clone)]
struct Graph {
    types: Vec<&'static str>,
    edges: Vec<(usize, usize)>,
}

impl Graph {
    fn node_id(index: usize) -> String {
        format!("n{index}")
    }

    fn client(&self) -> InMemoryCmsClient {
        let mut builder = GraphBuilder::new();
        for (index, content_type) in self.types.iter().enumerate() {
            builder = builder.node(&Self::node_id(index), content_type);
        }
        for (from, to) in &self.edges {
            builder = builder.edge(&Self::node_id(*from), &Self::node_id(*to));
        }
        InMemoryCmsClient::with_entries(builder.build())
    }

    /// Nodes reachable from node 0.
    fn reachable(&self) -> BTreeSet<usize> {
        let mut seen = BTreeSet::from([0]);
        let mut queue = VecDeque::from([0]);
        while let Some(node) = queue.pop_front() {
            for (_, to) in self.edges.iter().filter(|(from, _)| *from == node) {
                if seen.insert(*to) {
                    queue.push_back(*to);
                }
            }
        }
        seen
    }
}

fn graph_strategy() -> impl Strategy<Value = Graph> {
    (1usize..10).prop_flat_map(|nodes| {
        let types = prop::collection::vec(
            prop_oneof![
                3 => prop::sample::select(COPIED_TYPES.to_vec()),
                1 => Just(SHARED_TYPE),
            ],
            nodes - 1,
        );
        let edges = prop::collection::vec((0..nodes, 0..nodes), 0..nodes * 3);
        (types, edges).prop_map(|(rest, edges)| {
            let mut types = vec!["toolkit"];
            types.extend(rest);
            Graph {
                types,
                edges,
            }
        })
    })
}

fn run_clone(client: &InMemoryCmsClient, concurrency: usize) -> deepcopy_cli::pipeline::CloneReport {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        Cloner::new(client)
            .with_options(CloneOptions {
                max_concurrency: concurrency,
                ..CloneOptions::default()
            })
            .run(&EntryId::new("n0"))
            .await
            .unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Each reachable entry is fetched once; nothing else is fetched
    #[test]
    fn prop_reachable_entries_fetched_once(graph in graph_strategy(), concurrency in 1usize..5) {
        let client = graph.client();
        let report = run_clone(&client, concurrency);
        let reachable = graph.reachable();

        prop_assert_eq!(report.discovered, reachable.len());
        for index in 0..graph.types.len() {
            let expected = usize::from(reachable.contains(&index));
            prop_assert_eq!(client.fetch_count(&EntryId::new(Graph::node_id(index))), expected);
        }
    }

    /// Exactly the reachable copied entries get a clone
    #[test]
    fn prop_clones_match_copied_entries(graph in graph_strategy()) {
        let client = graph.client();
        let report = run_clone(&client, 3);

        let expected: BTreeSet<EntryId> = graph
            .reachable()
            .into_iter()
            .filter(|index| graph.types[*index] != SHARED_TYPE)
            .map(|index| EntryId::new(Graph::node_id(index)))
            .collect();
        let cloned: BTreeSet<EntryId> = report.clones.iter().map(|(original, _)| original.clone()).collect();

        prop_assert_eq!(&cloned, &expected);
        prop_assert_eq!(client.create_calls(), expected.len());
        prop_assert_eq!(report.updated, expected.len());
    }

    /// Clones link to clones of copied entries and to originals of shared ones
    #[test]
    fn prop_clone_links_are_rewritten(graph in graph_strategy()) {
        let client = graph.client();
        let report = run_clone(&client, 2);

        let clone_of: HashMap<EntryId, EntryId> = report
            .clones
            .iter()
            .map(|(original, clone)| (original.clone(), clone.id.clone()))
            .collect();
        let clone_ids: BTreeSet<&EntryId> = clone_of.values().collect();

        for (original, clone) in report.clones.iter() {
            let stored = client.get(&clone.id).unwrap();
            let source = client.get(original).unwrap();
            let expected: Vec<EntryId> = source
                .fields
                .entry_link_targets()
                .into_iter()
                .map(|target| clone_of.get(&target).cloned().unwrap_or(target))
                .collect();
            prop_assert_eq!(stored.fields.entry_link_targets(), expected);

            for target in stored.fields.entry_link_targets() {
                // no clone points at an original that was itself cloned
                prop_assert!(clone_ids.contains(&target) || !clone_of.contains_key(&target));
            }
        }
    }
}
