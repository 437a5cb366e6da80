use aura_game::constants::{
    CASH_OUT_REASON, CHALLENGE_STREAK, CHOICE_ADVANCE_DELAY_MS, END_CHECK_DELAY_MS, LOSS_REASON,
    TIMEOUT_ADVANCE_DELAY_MS,
};
use aura_game::{
    FixedClock, GameEvent, KeyValueStore, MemoryStore, OptionKind, ProgressStore, Scenario,
    ScenarioOption, ScenarioPool, Session, SessionConfig, Status, generate_daily_challenges,
};
use chrono::{NaiveDate, TimeZone, Utc};
use smallvec::smallvec;

type TestSession = Session<MemoryStore, FixedClock>;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

fn clock_on(d: u32) -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 10, d, 18, 0, 0).unwrap())
}

fn pool() -> ScenarioPool {
    ScenarioPool::from_scenarios(vec![Scenario {
        id: "group_chat".to_string(),
        text: "The group chat goes quiet after your message".to_string(),
        options: smallvec![
            ScenarioOption::fixed("plus300", OptionKind::Safe, 300).with_text("Send a meme"),
            ScenarioOption::fixed("plus100", OptionKind::Safe, 100).with_text("Say lol"),
            ScenarioOption::risk("sure_win", 1.0, 1_000, -1_000).with_text("Double down"),
            ScenarioOption::risk("sure_loss", 0.0, 1_000, -1_000).with_text("Explain the joke"),
            ScenarioOption::risk("doom", 0.0, 0, -20_000).with_text("Post your poetry"),
            ScenarioOption::fixed("win_big", OptionKind::Wild, 6_000).with_text("Go viral"),
        ],
    }])
    .unwrap()
}

fn session_on(store: MemoryStore, d: u32) -> TestSession {
    Session::with_clock(
        store,
        pool(),
        SessionConfig::default().with_seed(2026),
        clock_on(d),
    )
}

/// Choose, then wait until the session accepts input again.
fn choose_and_settle(session: &mut TestSession, option: &str) -> i64 {
    let res = session.choose(option).unwrap();
    session.advance(CHOICE_ADVANCE_DELAY_MS);
    while session.is_blocked() {
        session.advance(100);
    }
    res.delta
}

fn announced(events: &[GameEvent], achievement: &str) -> bool {
    events
        .iter()
        .any(|e| matches!(e, GameEvent::AchievementUnlocked { id, .. } if *id == achievement))
}

fn count_rewards(events: &[GameEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GameEvent::RewardGranted { .. }))
        .count()
}

#[test]
fn streak_bonus_kicks_in_on_the_sixth_gain() {
    let mut session = session_on(MemoryStore::new(), 16);
    session.start().unwrap();

    let first = session.choose("plus300").unwrap();
    assert_eq!(first.delta, 300);
    assert_eq!(session.state().aura, 300);
    assert_eq!(session.state().streak, 1);
    session.advance(CHOICE_ADVANCE_DELAY_MS);

    for _ in 0..4 {
        assert_eq!(choose_and_settle(&mut session, "plus100"), 100);
    }
    assert_eq!(session.state().streak, 5);
    assert_eq!(session.state().aura, 700);

    let sixth = session.choose("plus100").unwrap();
    assert_eq!(sixth.raw_delta, 100);
    assert_eq!(sixth.delta, 125);
    assert_eq!(session.state().aura, 825);
    assert_eq!(session.state().streak, 6);
    assert_eq!(session.stats().highest_streak, 6);
}

#[test]
fn streak_challenge_pays_out_exactly_once() {
    let mut session = session_on(MemoryStore::new(), 16);
    session.start().unwrap();
    for _ in 0..5 {
        choose_and_settle(&mut session, "plus100");
    }
    let streak = session
        .challenges()
        .iter()
        .find(|c| c.id.starts_with(CHALLENGE_STREAK))
        .cloned()
        .unwrap();
    assert!(streak.completed);
    let reward = streak.reward;

    let aura_before = session.state().aura;
    session.advance(5_000);
    let events = session.drain_events();
    assert_eq!(count_rewards(&events), 1);
    assert!(events.contains(&GameEvent::ChallengeCompleted {
        id: streak.id.clone(),
        reward,
    }));
    assert!(session.state().aura >= aura_before + reward);

    // Further gains at a higher streak never re-trigger the payout.
    choose_and_settle(&mut session, "plus100");
    session.advance(5_000);
    assert_eq!(count_rewards(&session.drain_events()), 0);
}

#[test]
fn risk_extremes_resolve_deterministically() {
    let mut session = session_on(MemoryStore::new(), 16);
    session.start().unwrap();
    for _ in 0..5 {
        assert_eq!(choose_and_settle(&mut session, "sure_loss"), -1_000);
        assert_eq!(choose_and_settle(&mut session, "sure_win"), 1_000);
    }
    assert_eq!(session.stats().risks_taken, 10);
    assert_eq!(session.stats().risks_won, 5);
}

#[test]
fn reaching_the_floor_loses_the_run() {
    let store = MemoryStore::new();
    let mut session = session_on(store.clone(), 16);
    session.start().unwrap();
    session.choose("doom").unwrap();
    assert_eq!(session.state().aura, -20_000);

    session.advance(END_CHECK_DELAY_MS - 1);
    assert_eq!(session.status(), Status::Playing);
    session.advance(1);
    assert_eq!(session.status(), Status::GameOver);

    let outcome = session.last_outcome().unwrap();
    assert_eq!(outcome.reason, LOSS_REASON);
    assert!(!outcome.won);

    let reloaded = ProgressStore::load(store, day(16));
    assert_eq!(reloaded.stats().games_lost, 1);
    assert_eq!(reloaded.stats().games_won, 0);
}

#[test]
fn timeouts_alone_can_sink_a_run() {
    let mut session = session_on(MemoryStore::new(), 16);
    session.start().unwrap();
    let window = session.config().decision_window_ms();
    let mut guard = 0;
    while session.status() == Status::Playing {
        session.advance(window + TIMEOUT_ADVANCE_DELAY_MS);
        guard += 1;
        assert!(guard < 50, "run never ended");
    }

    // The tenth scenario completes the daily scenario challenge, whose 500
    // payout buys one extra timeout before the floor.
    assert_eq!(session.stats().timeouts, 21);
    assert_eq!(session.stats().total_decisions, 0);
    assert_eq!(session.state().aura, -20_500);
    assert_eq!(session.state().history, vec![LOSS_REASON.to_string()]);
}

#[test]
fn cashing_out_above_the_bar_is_a_win_and_flushes_rewards() {
    let mut session = session_on(MemoryStore::new(), 16);
    session.start().unwrap();
    choose_and_settle(&mut session, "win_big");

    // The aura challenge completed; its payout is still pending.
    assert_eq!(session.state().aura, 6_000);
    let outcome = session.cash_out().unwrap();
    assert_eq!(outcome.reason, CASH_OUT_REASON);
    assert!(outcome.won);
    assert_eq!(outcome.aura, 6_800);
    assert_eq!(session.stats().games_won, 1);
    assert_eq!(session.stats().total_aura_gained, 6_800);

    session.advance(10_000);
    assert_eq!(count_rewards(&session.drain_events()), 1);
    assert_eq!(session.stats().total_aura_gained, 6_800);
}

#[test]
fn pending_reward_survives_pause_and_menu_return_once() {
    let store = MemoryStore::new();
    let mut session = session_on(store.clone(), 16);
    session.start().unwrap();
    session.choose("win_big").unwrap();
    session.pause().unwrap();
    session.advance(60_000);
    assert_eq!(count_rewards(&session.drain_events()), 0);

    session.return_to_menu().unwrap();
    assert_eq!(count_rewards(&session.drain_events()), 1);
    assert_eq!(session.state().aura, 0);
    session.advance(60_000);
    assert_eq!(count_rewards(&session.drain_events()), 0);

    let reloaded = ProgressStore::load(store, day(16));
    assert_eq!(reloaded.stats().total_aura_gained, 6_800);
    assert!(reloaded.challenges().iter().any(|c| c.completed));
}

#[test]
fn first_unlock_is_announced_after_the_popup_delay() {
    let mut session = session_on(MemoryStore::new(), 16);
    session.start().unwrap();
    session.choose("plus100").unwrap();
    assert!(session.achievements()[0].unlocked);
    assert!(!announced(&session.drain_events(), "first_blood"));
    session.advance(999);
    assert!(!announced(&session.drain_events(), "first_blood"));
    session.advance(1);
    assert!(announced(&session.drain_events(), "first_blood"));
}

#[test]
fn yesterdays_challenges_are_regenerated() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    {
        let mut yesterday = ProgressStore::load(store.clone(), day(15));
        let mut set = yesterday.challenges().to_vec();
        for challenge in &mut set {
            challenge.progress = challenge.target;
            challenge.completed = true;
        }
        yesterday.set_challenges(set);
    }
    assert!(store.get("aura_daily_challenges")?.is_some());

    let session = session_on(store, 16);
    assert_eq!(session.challenges(), generate_daily_challenges(day(16)).as_slice());
    assert!(
        session
            .challenges()
            .iter()
            .all(|c| c.progress == 0 && !c.completed && c.date == "2026-10-16")
    );
    Ok(())
}

#[test]
fn progress_carries_across_sessions_and_days() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut first = session_on(store.clone(), 15);
    first.start()?;
    choose_and_settle(&mut first, "plus300");
    first.cash_out()?;
    let store = first.into_store();

    let second = session_on(store, 16);
    let stats = second.stats();
    assert_eq!(stats.total_games_played, 1);
    assert_eq!(stats.total_decisions, 1);
    assert_eq!(stats.games_lost, 1);
    assert_eq!(stats.consecutive_days, 2);
    assert_eq!(stats.last_played_date, "2026-10-16");
    assert_eq!(second.state().total_games_played, 1);
    assert!(second.achievements()[0].unlocked);
    Ok(())
}
