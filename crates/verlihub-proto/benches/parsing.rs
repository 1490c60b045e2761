use criterion::{black_box, criterion_group, criterion_main, Criterion};
use verlihub_proto::Message;

fn bench_parse_myinfo(c: &mut Criterion) {
    let frame = "$MyINFO $ALL alice desc<++ V:1,M:A,H:1/0/0,S:1,L:256>$ $100\x01$alice@x$1073741824$";
    c.bench_function("parse myinfo", |b| {
        b.iter(|| Message::parse(black_box(frame)).unwrap())
    });
}

fn bench_parse_chat(c: &mut Criterion) {
    let frame = "alice hello there, this is a chat line of moderate length";
    c.bench_function("parse chat", |b| {
        b.iter(|| Message::parse(black_box(frame)).unwrap())
    });
}

criterion_group!(benches, bench_parse_myinfo, bench_parse_chat);
criterion_main!(benches);
