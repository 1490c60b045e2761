use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::net::IpAddr;
use tokio::sync::mpsc;
use verlihub_rs::config::FloodConfig;
use verlihub_rs::security::flood::{FloodKind, UserFloodState};
use verlihub_rs::state::{Class, Directory, Mode, Rights, SupportsBitmask, User, UserKind};

fn make_user(nick: &str, outbox: mpsc::Sender<Vec<u8>>) -> User {
    User {
        nick: nick.to_string(),
        kind: UserKind::Human,
        class: Class::NORMAL,
        myinfo: String::new(),
        fake_myinfo: String::new(),
        share: 1024,
        mode: Mode::Active,
        is_lan: false,
        rights: Rights::default(),
        supports: SupportsBitmask::default(),
        in_list: true,
        ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
        outbox: Some(outbox),
        close_tx: None,
        live_tx: None,
    }
}

fn bench_broadcast_fanout(c: &mut Criterion) {
    // A single shared sender stands in for 2000 per-connection outboxes;
    // the receiver is kept alive but never drained since nothing is sent.
    let (tx, _rx) = mpsc::channel::<Vec<u8>>(1);

    let mut dir = Directory::new();
    for i in 0..2000 {
        let nick = format!("user{i}");
        dir.add(make_user(&nick, tx.clone()));
        dir.mark_in_list(&nick);
    }

    c.bench_function("broadcast fanout 2000 users", |b| {
        b.iter(|| {
            let count = dir.sendable_in_class_range(black_box(Class::NORMAL), black_box(Class::MASTER)).count();
            black_box(count)
        })
    });
}

fn bench_flood_bump(c: &mut Criterion) {
    let config = FloodConfig::default();
    let mut state = UserFloodState::default();

    c.bench_function("flood guard chat bump", |b| {
        let mut now = 0i64;
        b.iter(|| {
            now += 1;
            black_box(state.bump(FloodKind::Chat, now, black_box(&config)))
        })
    });
}

criterion_group!(benches, bench_broadcast_fanout, bench_flood_bump);
criterion_main!(benches);
