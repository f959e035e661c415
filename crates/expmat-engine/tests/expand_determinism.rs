use expmat_core::from_yaml_str;
use expmat_core::schema::MatrixDecl;
use expmat_engine::Config;
use proptest::prelude::*;
use proptest::sample::subsequence;

const BASE_DOC: &str = r#"
instances:
  - set: small
    items: [a.graph, b.graph]
  - set: large
    items: [c.graph]
builds:
  - name: solver
revisions:
  - name: r1
    build_version: { solver: v1 }
  - name: r2
    build_version: { solver: v2 }
variants:
  - axis: size
    items: [{ name: s1 }, { name: s2 }]
  - axis: mode
    items: [{ name: fast }, { name: exact }]
experiments:
  - name: e1
    use_builds: [solver]
    repeat: 2
  - name: e2
"#;

fn names(pool: &[&str]) -> impl Strategy<Value = Option<Vec<String>>> {
    let owned: Vec<String> = pool.iter().map(|s| s.to_string()).collect();
    let len = owned.len();
    prop_oneof![
        Just(None),
        subsequence(owned, 0..=len).prop_map(Some),
    ]
}

fn leaf() -> impl Strategy<Value = MatrixDecl> {
    (
        names(&["e1", "e2"]),
        names(&["r1", "r2"]),
        names(&["s1", "s2", "fast", "exact"]),
        names(&["small", "large"]),
        proptest::option::of(1usize..4),
    )
        .prop_map(
            |(experiments, revisions, variants, instsets, repetitions)| MatrixDecl {
                experiments,
                revisions,
                variants,
                instsets,
                repetitions,
                ..MatrixDecl::default()
            },
        )
}

type RunKey = (String, String, Vec<String>, String, usize);

/// Canonical identity tuple, ordered the way the engine orders runs.
fn run_keys(cfg: &Config) -> Vec<RunKey> {
    cfg.discover_all_runs()
        .unwrap()
        .iter()
        .map(|run| {
            let experiment = run.experiment();
            (
                experiment.name().to_string(),
                experiment
                    .revision()
                    .map_or("_none".to_string(), |rev| rev.name().to_string()),
                experiment
                    .variation()
                    .iter()
                    .map(|var| var.name().to_string())
                    .collect(),
                run.instance().shortname().to_string(),
                run.repetition(),
            )
        })
        .collect()
}

fn config_with_leaves(leaves: Vec<MatrixDecl>) -> Config {
    let mut doc = from_yaml_str(BASE_DOC).unwrap();
    doc.matrix = Some(MatrixDecl {
        include: Some(leaves),
        ..MatrixDecl::default()
    });
    Config::new("/base", doc).unwrap()
}

proptest! {
    #[test]
    fn expansion_is_sorted_and_duplicate_free(first in leaf(), second in leaf()) {
        let cfg = config_with_leaves(vec![first, second]);
        let keys = run_keys(&cfg);
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(&keys, &sorted);
    }

    #[test]
    fn expansion_is_independent_of_branch_order(first in leaf(), second in leaf()) {
        let forward = config_with_leaves(vec![first.clone(), second.clone()]);
        let swapped = config_with_leaves(vec![second, first]);
        prop_assert_eq!(run_keys(&forward), run_keys(&swapped));
    }

    #[test]
    fn expansion_is_reproducible(first in leaf(), second in leaf()) {
        let cfg = config_with_leaves(vec![first, second]);
        prop_assert_eq!(run_keys(&cfg), run_keys(&cfg));
    }

    #[test]
    fn duplicating_a_branch_changes_nothing(first in leaf()) {
        let single = config_with_leaves(vec![first.clone()]);
        let doubled = config_with_leaves(vec![first.clone(), first]);
        prop_assert_eq!(run_keys(&single), run_keys(&doubled));
    }
}
