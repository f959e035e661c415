use criterion::{black_box, criterion_group, criterion_main, Criterion};
use expmat_core::schema::{
    AxisDecl, ConfigDoc, ExperimentDecl, InstanceBlock, InstanceItemDecl, VariantDecl,
};
use expmat_engine::Config;

fn wide_config() -> Config {
    let doc = ConfigDoc {
        instdir: "instances".to_string(),
        instances: vec![InstanceBlock {
            items: (0..50)
                .map(|idx| InstanceItemDecl::Name(format!("inst{idx:02}.graph")))
                .collect(),
            ..InstanceBlock::default()
        }],
        variants: (0..3)
            .map(|axis| AxisDecl {
                axis: format!("axis{axis}"),
                items: (0..4)
                    .map(|var| VariantDecl {
                        name: format!("a{axis}v{var}"),
                        args: Vec::new(),
                        num_nodes: None,
                        procs_per_node: None,
                        num_threads: None,
                    })
                    .collect(),
            })
            .collect(),
        experiments: (0..4)
            .map(|idx| ExperimentDecl {
                name: format!("exp{idx}"),
                use_builds: None,
                args: Vec::new(),
                environ: Default::default(),
                timeout: None,
                repeat: Some(3),
                num_nodes: None,
                procs_per_node: None,
                num_threads: None,
                scheduler_args: Vec::new(),
            })
            .collect(),
        ..ConfigDoc::default()
    };
    Config::new("/base", doc).unwrap()
}

fn expand_bench(c: &mut Criterion) {
    let cfg = wide_config();

    c.bench_function("all_experiments", |b| {
        b.iter(|| black_box(cfg.all_experiments().unwrap().len()));
    });

    c.bench_function("discover_all_runs", |b| {
        b.iter(|| black_box(cfg.discover_all_runs().unwrap().len()));
    });
}

criterion_group!(benches, expand_bench);
criterion_main!(benches);
