// Poll cycle tests: drops, failures and scheduling

use super::*;
use dealwatch::config::SchedulerConfig;
use dealwatch::PriceCheckScheduler;

async fn track(app: &TestApp, user: &str, url: &str, price: &str) -> anyhow::Result<()> {
    app.fetcher.set_price(url, price);
    app.product_manager.track_product(user, url).await?;
    Ok(())
}

#[tokio::test]
async fn test_drop_notifies_exactly_once() -> anyhow::Result<()> {
    let app = create_test_app();
    track(&app, "1001", KETTLE_URL, "1299").await?;

    app.fetcher.set_price(KETTLE_URL, "999");
    let first = app.product_manager.check_all_products().await;
    let second = app.product_manager.check_all_products().await;

    assert_eq!(first.price_drops, 1);
    assert_eq!(second.price_drops, 0);

    let alerts = app.notifier.messages_to("1001");
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("PRICE DROP ALERT!"));
    assert!(alerts[0].contains("Old Price: ₹1299.00"));
    assert!(alerts[0].contains("New Price: ₹999.00"));
    assert!(alerts[0].contains("tag=amazingde0df9-21"));

    let kettle = app.product_manager.list_products("1001").await.unwrap();
    let kettle = kettle.get(KETTLE_URL).unwrap();
    assert_eq!(kettle.price, dec("999"));
    assert_eq!(kettle.low_price, dec("999"));
    assert_eq!(kettle.high_price, dec("1299"));
    Ok(())
}

#[tokio::test]
async fn test_unchanged_or_higher_price_is_silent() -> anyhow::Result<()> {
    let app = create_test_app();
    track(&app, "1001", KETTLE_URL, "1299").await?;
    track(&app, "1001", MOUSE_URL, "499").await?;

    app.fetcher.set_price(MOUSE_URL, "599");
    let report = app.product_manager.check_all_products().await;

    assert_eq!(report.products_checked, 2);
    assert_eq!(report.price_drops, 0);
    assert!(app.notifier.messages().is_empty());

    let watchlist = app.product_manager.list_products("1001").await.unwrap();
    assert_eq!(watchlist.get(KETTLE_URL).unwrap().price, dec("1299"));
    let mouse = watchlist.get(MOUSE_URL).unwrap();
    assert_eq!(mouse.price, dec("499"));
    assert_eq!(mouse.high_price, dec("599"));
    Ok(())
}

#[tokio::test]
async fn test_price_follows_increases_when_enabled() -> anyhow::Result<()> {
    let mut config = get_test_config();
    config.scheduler.track_price_increases = true;
    let app = create_test_app_with(config);
    track(&app, "1001", MOUSE_URL, "499").await?;

    app.fetcher.set_price(MOUSE_URL, "599");
    app.product_manager.check_all_products().await;
    app.fetcher.set_price(MOUSE_URL, "549");
    app.product_manager.check_all_products().await;

    let alerts = app.notifier.messages_to("1001");
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Old Price: ₹599.00"));

    let watchlist = app.product_manager.list_products("1001").await.unwrap();
    let mouse = watchlist.get(MOUSE_URL).unwrap();
    assert_eq!(mouse.price, dec("549"));
    assert_eq!(mouse.high_price, dec("599"));
    assert_eq!(mouse.low_price, dec("499"));
    Ok(())
}

#[tokio::test]
async fn test_failing_product_is_skipped_and_others_processed() -> anyhow::Result<()> {
    let app = create_test_app();
    track(&app, "1001", KETTLE_URL, "1299").await?;
    track(&app, "1001", MOUSE_URL, "499").await?;
    track(&app, "2002", DESK_URL, "15999").await?;

    app.fetcher.fail(KETTLE_URL);
    app.fetcher.set_price(MOUSE_URL, "450");
    app.fetcher.set_price(DESK_URL, "14999");
    let report = app.product_manager.check_all_products().await;

    assert_eq!(report.products_failed, 1);
    assert_eq!(report.products_checked, 2);
    assert_eq!(report.price_drops, 2);
    assert!(report.saved);
    assert_eq!(app.notifier.messages_to("1001").len(), 1);
    assert_eq!(app.notifier.messages_to("2002").len(), 1);

    let reloaded = ProductStore::load(app.data_file());
    let kettle = reloaded.watchlist("1001").unwrap().get(KETTLE_URL).unwrap();
    assert_eq!(kettle.price, dec("1299"));
    assert_eq!(kettle.low_price, dec("1299"));
    assert_eq!(
        reloaded.watchlist("2002").unwrap().get(DESK_URL).unwrap().price,
        dec("14999")
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_store_cycle_still_saves() -> anyhow::Result<()> {
    let app = create_test_app();

    let report = app.product_manager.check_all_products().await;

    assert_eq!(report.products_checked, 0);
    assert_eq!(app.fetcher.call_count(), 0);
    assert!(report.saved);
    assert_eq!(std::fs::read_to_string(app.data_file())?, "{}");
    Ok(())
}

#[tokio::test]
async fn test_scheduler_runs_cycle_on_demand() -> anyhow::Result<()> {
    let app = create_test_app();
    track(&app, "1001", KETTLE_URL, "1299").await?;
    app.fetcher.set_price(KETTLE_URL, "1199");

    let config = SchedulerConfig {
        interval_secs: 3600,
        initial_delay_secs: 3600,
        track_price_increases: false,
    };
    let mut scheduler =
        PriceCheckScheduler::new(Arc::clone(&app.product_manager), config).await?;
    scheduler.start().await?;

    let report = scheduler.run_cycle_now().await.unwrap();
    assert_eq!(report.price_drops, 1);

    let stats = scheduler.get_stats().await;
    assert_eq!(stats.completed_runs, 1);
    assert!(stats.last_run.is_some());

    scheduler.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_initial_delay_triggers_first_cycle() -> anyhow::Result<()> {
    let app = create_test_app();
    track(&app, "1001", KETTLE_URL, "1299").await?;
    let calls_after_track = app.fetcher.call_count();

    let config = SchedulerConfig {
        interval_secs: 3600,
        initial_delay_secs: 1,
        track_price_increases: false,
    };
    let mut scheduler =
        PriceCheckScheduler::new(Arc::clone(&app.product_manager), config).await?;
    scheduler.start().await?;

    tokio::time::sleep(std::time::Duration::from_secs(3)).await;

    assert!(app.fetcher.call_count() > calls_after_track);
    assert!(scheduler.get_stats().await.completed_runs >= 1);

    scheduler.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_interval_counts_from_first_run() -> anyhow::Result<()> {
    let app = create_test_app();
    track(&app, "1001", KETTLE_URL, "1299").await?;

    let config = SchedulerConfig {
        interval_secs: 1,
        initial_delay_secs: 4,
        track_price_increases: false,
    };
    let mut scheduler =
        PriceCheckScheduler::new(Arc::clone(&app.product_manager), config).await?;
    scheduler.start().await?;

    // A short interval must not fire before the initial delay has passed
    tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
    assert_eq!(scheduler.get_stats().await.completed_runs, 0);

    tokio::time::sleep(std::time::Duration::from_secs(4)).await;
    assert!(scheduler.get_stats().await.completed_runs >= 2);

    scheduler.shutdown().await?;
    Ok(())
}
