//! Daemon startup and the event loop
//!
//! Startup is fail-fast: no modules or no /dev/uleds means exit with an
//! error. After that the loop treats everything as transient and keeps
//! running until SIGINT/SIGTERM.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tokio::signal::ctrl_c;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, sleep_until, MissedTickBehavior};
use tracing::{debug, info, warn};

use qmk_via::{discover, Channel, ViaChannel};

use crate::cli::Config;
use crate::devices::display_name;
use crate::group::{group_targets, Group, Propagation};
use crate::hotplug;
use crate::level::Level;
use crate::notify::Notifier;
use crate::uleds::{Uleds, UledsEvent};

/// Attempts to read the initial brightness off a group master before
/// giving up and starting from off.
const INIT_READ_ATTEMPTS: u32 = 5;
const INIT_READ_BACKOFF: Duration = Duration::from_millis(100);

/// One virtual LED with everything attached to it.
struct GroupRuntime {
    group: Group,
    uleds: Uleds,
    notifier: Notifier,
}

pub async fn run(config: &Config) -> Result<()> {
    let api = hidapi::HidApi::new().context("initializing hidapi")?;
    let targets = discover(&api, &config.selectors);
    if targets.is_empty() {
        bail!("no backlight modules found (nothing to bridge)");
    }
    for target in &targets {
        info!("found {target} ({})", display_name(target.pid));
    }
    drop(api);

    let chan = ViaChannel::new();
    let groups = group_targets(&targets, config.mode, config.debounce, config.max_brightness);

    let (tx, mut events) = mpsc::channel::<UledsEvent>(64);
    let mut runtimes = Vec::with_capacity(groups.len());
    for (idx, mut group) in groups.into_iter().enumerate() {
        let mut uleds = Uleds::create(group.name(), config.max_brightness)
            .await
            .with_context(|| format!("registering virtual LED {}", group.name()))?;

        let level = initial_level(&group, &chan).await;
        group.activate();
        // master already holds this value when the read succeeded
        group.apply(level, Propagation::ExcludeMaster, &chan);
        uleds.set_ui_value(level.ui_value(config.max_brightness)).await?;

        let notifier = Notifier::new(group.name(), config.max_brightness);
        notifier.notify(level);

        info!(
            "{}: {} member(s), master {}, level {level}",
            group.name(),
            group.members().len(),
            group.master()
        );

        uleds.spawn_reader(idx, tx.clone());
        runtimes.push(GroupRuntime {
            group,
            uleds,
            notifier,
        });
    }
    drop(tx);

    let mut monitor = match hotplug::monitor() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!("udev monitor unavailable, hotplug disabled: {e}");
            None
        }
    };

    let mut poll = interval(config.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let deadline = runtimes
            .iter()
            .filter_map(|r| r.group.next_deadline())
            .min();

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    bail!("all virtual LED readers exited");
                };
                let rt = &mut runtimes[event.group];
                if let Some(level) = rt.group.handle_ui_event(event.raw, Instant::now()) {
                    info!("{}: UI set level {level}", rt.group.name());
                    rt.group.apply(level, Propagation::Broadcast, &chan);
                    rt.notifier.notify(level);
                }
            }

            _ = poll.tick() => {
                poll_masters(&mut runtimes, &chan, config.max_brightness).await;
            }

            () = async {
                match deadline {
                    Some(d) => sleep_until(d.into()).await,
                    None => std::future::pending().await,
                }
            } => {
                let now = Instant::now();
                for rt in &mut runtimes {
                    if let Some(level) = rt.group.take_expired_pending(now) {
                        info!("{}: UI set level {level} (debounced)", rt.group.name());
                        rt.group.apply(level, Propagation::Broadcast, &chan);
                        rt.notifier.notify(level);
                    }
                }
            }

            event = async {
                match monitor.as_mut() {
                    Some(m) => m.next().await,
                    None => std::future::pending().await,
                }
            } => {
                match event {
                    Some(Ok(event)) => {
                        let subsystem = event.subsystem().and_then(|s| s.to_str());
                        let hid_id = event.property_value("HID_ID").and_then(|s| s.to_str());
                        if hotplug::is_hid_related(subsystem, hid_id) {
                            debug!("hid topology change, rescanning");
                            rescan(&mut runtimes, config, &chan);
                        }
                    }
                    Some(Err(e)) => debug!("udev event error: {e}"),
                    None => {
                        warn!("udev monitor closed, hotplug disabled");
                        monitor = None;
                    }
                }
            }

            _ = ctrl_c() => {
                info!("shutting down");
                for rt in &mut runtimes {
                    rt.group.close();
                }
                return Ok(());
            }
        }
    }
}

/// Read the master's current brightness so a restart does not stomp a
/// level the user already chose. Firmware needs a beat after enumeration
/// before it answers, hence the retries.
async fn initial_level(group: &Group, chan: &dyn Channel) -> Level {
    for attempt in 1..=INIT_READ_ATTEMPTS {
        match chan.get_percent(group.master()) {
            Ok(pct) => return Level::from_percent(pct),
            Err(e) if attempt < INIT_READ_ATTEMPTS => {
                debug!("{}: initial read attempt {attempt} failed: {e}", group.name());
                sleep(INIT_READ_BACKOFF).await;
            }
            Err(e) => {
                warn!("{}: initial read failed, starting off: {e}", group.name());
            }
        }
    }
    Level::OFF
}

/// Periodic drift check: the brightness hotkey talks straight to the
/// firmware, so the master is the source of truth between our writes.
async fn poll_masters(runtimes: &mut [GroupRuntime], chan: &ViaChannel, max_brightness: u32) {
    for rt in runtimes.iter_mut() {
        let pct = match chan.get_percent(rt.group.master()) {
            Ok(pct) => pct,
            Err(e) => {
                // transient; hotplug handles the device actually going away
                debug!("{}: poll failed: {e}", rt.group.name());
                continue;
            }
        };
        if let Some(level) = rt.group.handle_poll(pct) {
            info!("{}: hardware moved to level {level}", rt.group.name());
            rt.group.apply(level, Propagation::ExcludeMaster, chan);
            if let Err(e) = rt.uleds.set_ui_value(level.ui_value(max_brightness)).await {
                warn!("{}: sysfs update failed: {e}", rt.group.name());
            }
            if let Err(e) = rt.uleds.notify_changed().await {
                debug!("{}: uevent emit failed: {e}", rt.group.name());
            }
            rt.notifier.notify(level);
        }
    }
}

/// Re-discover modules and reconcile every group's membership.
fn rescan(runtimes: &mut [GroupRuntime], config: &Config, chan: &ViaChannel) {
    let api = match hidapi::HidApi::new() {
        Ok(api) => api,
        Err(e) => {
            warn!("rescan skipped, hidapi unavailable: {e}");
            return;
        }
    };
    let targets = discover(&api, &config.selectors);
    for rt in runtimes.iter_mut() {
        if hotplug::reconcile(&mut rt.group, &targets, chan) {
            info!(
                "{}: membership now {} member(s)",
                rt.group.name(),
                rt.group.members().len()
            );
        }
    }
}
