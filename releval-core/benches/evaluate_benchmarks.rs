use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Map, Value, json};

use releval_core::{EvaluationSession, JudgmentSet, ResultSet, aggregate};

/// `queries` queries with `docs` documents each; every third document is
/// relevant, scores decrease with a few ties.
fn fixture(queries: usize, docs: usize) -> (Value, Value) {
    let mut qrels = Map::new();
    let mut run = Map::new();
    for q in 0..queries {
        let mut judged = Map::new();
        let mut scored = Map::new();
        for d in 0..docs {
            let docno = format!("doc{d:05}");
            if d % 2 == 0 {
                judged.insert(docno.clone(), json!(i64::from(d % 3 == 0)));
            }
            scored.insert(docno, json!(((docs - d) / 2) as f64));
        }
        qrels.insert(format!("q{q}"), Value::Object(judged));
        run.insert(format!("q{q}"), Value::Object(scored));
    }
    (Value::Object(qrels), Value::Object(run))
}

fn bench_marshalling(c: &mut Criterion) {
    let (qrels, run) = fixture(50, 1000);

    c.bench_function("build_judgment_set_50x500", |b| {
        b.iter(|| JudgmentSet::from_value(black_box(&qrels)))
    });

    c.bench_function("build_result_set_50x1000", |b| {
        b.iter(|| ResultSet::from_value(black_box(&run)))
    });
}

fn bench_evaluation(c: &mut Criterion) {
    let (qrels, run) = fixture(50, 1000);

    let small = EvaluationSession::new(&qrels, &json!(["map", "P.10"]), 1).unwrap();
    c.bench_function("evaluate_map_p10", |b| {
        b.iter(|| small.evaluate(black_box(&run)))
    });

    let official = EvaluationSession::new(
        &qrels,
        &json!(["map", "gm_map", "Rprec", "bpref", "recip_rank", "P", "recall", "ndcg_cut"]),
        1,
    )
    .unwrap();
    c.bench_function("evaluate_official_like", |b| {
        b.iter(|| official.evaluate(black_box(&run)))
    });

    let results = official.evaluate(&run).unwrap();
    c.bench_function("aggregate_results", |b| {
        b.iter(|| aggregate(black_box(&results)))
    });
}

criterion_group!(benches, bench_marshalling, bench_evaluation);
criterion_main!(benches);
