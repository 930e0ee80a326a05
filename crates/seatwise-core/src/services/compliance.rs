//! Compliance evaluator.
//!
//! Pure reads over current store state: utilization, expiry windows,
//! at-risk devices, and the recurring alert scan. Nothing is cached past
//! query time, so reported state can never diverge from what the
//! assignment manager enforces.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::CoreConfig;
use crate::error::{LicensingError, Result};
use crate::model::{
    AlertCondition, AlertEvent, AlertSeverity, AlertSubject, Device, DeviceStatus, License,
};
use crate::store::{EntityStore, StoreSnapshot};
use crate::types::{EntityKind, LicenseId};

/// Seat usage of a single license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utilization {
    /// License the figures describe.
    pub license_id: LicenseId,
    /// Seats currently in use.
    pub used: u32,
    /// Seats purchased.
    pub total_seats: u32,
}

impl Utilization {
    /// Used fraction in [0, 1].
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total_seats == 0 {
            return 0.0;
        }
        f64::from(self.used) / f64::from(self.total_seats)
    }

    /// Used percentage in [0, 100].
    #[must_use]
    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }
}

/// Banding of a utilization figure against the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilizationBand {
    /// Below the warning band.
    Ok,
    /// At or above the warning band, below the over-utilization threshold.
    Warning,
    /// At or above the over-utilization threshold.
    Critical,
}

/// License status distribution for compliance review.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplianceReport {
    pub total_licenses: usize,
    pub valid: usize,
    pub expiring_within_30_days: usize,
    pub expiring_within_60_days: usize,
    pub expired: usize,
    pub over_utilized: usize,
    /// Percentage of licenses in the `valid` bucket.
    pub compliance_rate: f64,
}

/// Service computing utilization, expiry, and risk over store state.
pub struct ComplianceService {
    store: EntityStore,
    config: CoreConfig,
    /// Conditions already signaled and not yet cleared. Guarded by an async
    /// mutex so overlapping scans serialize and never emit duplicates.
    alerted: Mutex<HashSet<(AlertSubject, AlertCondition)>>,
}

impl ComplianceService {
    /// Create a new compliance service.
    #[must_use]
    pub fn new(store: EntityStore, config: CoreConfig) -> Self {
        Self {
            store,
            config,
            alerted: Mutex::new(HashSet::new()),
        }
    }

    /// Seat usage for one license at query time.
    pub async fn utilization(&self, license_id: LicenseId) -> Result<Utilization> {
        let license = self
            .store
            .get_license(&license_id)
            .await?
            .ok_or_else(|| LicensingError::not_found(EntityKind::License, license_id))?;
        let used = self.store.active_seat_count(&license_id).await?;
        Ok(Utilization {
            license_id,
            used: used as u32,
            total_seats: license.total_seats,
        })
    }

    /// Band a utilization figure against the configured thresholds.
    #[must_use]
    pub fn band(&self, utilization: &Utilization) -> UtilizationBand {
        let fraction = utilization.fraction();
        if fraction >= self.config.over_utilization_threshold {
            UtilizationBand::Critical
        } else if fraction >= self.config.utilization_warning_threshold {
            UtilizationBand::Warning
        } else {
            UtilizationBand::Ok
        }
    }

    /// Licenses with `valid_until` inside `[now, now + within_days]`,
    /// soonest first; ties broken by license id for determinism.
    pub async fn expiring(&self, within_days: i64) -> Result<Vec<License>> {
        let now = Utc::now();
        let snapshot = self.store.snapshot().await?;
        let mut licenses: Vec<_> = snapshot
            .licenses
            .into_iter()
            .filter(|l| l.expires_within(now, within_days))
            .collect();
        licenses.sort_by(|a, b| {
            a.valid_until
                .cmp(&b.valid_until)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(licenses)
    }

    /// Devices currently holding at least one expired or over-utilized
    /// license, ordered by device id. Decommissioned devices are out of
    /// service and excluded.
    pub async fn at_risk_devices(&self) -> Result<Vec<Device>> {
        let now = Utc::now();
        let snapshot = self.store.snapshot().await?;
        let risky = self.risky_licenses(&snapshot, now);

        let mut devices: Vec<_> = snapshot
            .devices
            .into_iter()
            .filter(|d| d.status != DeviceStatus::Decommissioned)
            .filter(|d| {
                snapshot.assignments.iter().any(|a| {
                    a.device_id == d.id && a.is_active() && risky.contains_key(&a.license_id)
                })
            })
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }

    /// The recurring scan: one event per newly-crossed condition.
    ///
    /// Idempotent between state changes — a condition stays suppressed
    /// while it persists, re-arms when it clears, and is signaled again on
    /// re-entry.
    #[instrument(skip(self))]
    pub async fn evaluate_alerts(&self) -> Result<Vec<AlertEvent>> {
        let mut alerted = self.alerted.lock().await;
        let now = Utc::now();
        let snapshot = self.store.snapshot().await?;

        let current = self.current_conditions(&snapshot, now);

        let mut events: Vec<AlertEvent> = current
            .iter()
            .filter(|(key, _)| !alerted.contains(*key))
            .map(|(_, event)| event.clone())
            .collect();
        events.sort_by(|a, b| {
            a.condition
                .cmp(&b.condition)
                .then_with(|| a.subject.to_string().cmp(&b.subject.to_string()))
        });

        alerted.retain(|key| current.contains_key(key));
        alerted.extend(current.into_keys());

        debug!(
            new_alerts = events.len(),
            tracked_conditions = alerted.len(),
            "alert scan complete"
        );
        Ok(events)
    }

    /// License status distribution at query time.
    pub async fn report(&self) -> Result<ComplianceReport> {
        let now = Utc::now();
        let snapshot = self.store.snapshot().await?;
        let usage = seat_usage(&snapshot);

        let mut report = ComplianceReport {
            total_licenses: snapshot.licenses.len(),
            ..Default::default()
        };
        for license in &snapshot.licenses {
            let days = license.days_until_expiry(now);
            if license.is_expired(now) {
                report.expired += 1;
            } else if days <= 30 {
                report.expiring_within_30_days += 1;
            } else if days <= 60 {
                report.expiring_within_60_days += 1;
            } else {
                report.valid += 1;
            }

            if over_threshold(
                usage.get(&license.id).copied().unwrap_or(0),
                license.total_seats,
                self.config.over_utilization_threshold,
            ) {
                report.over_utilized += 1;
            }
        }
        if report.total_licenses > 0 {
            report.compliance_rate =
                (report.valid as f64 / report.total_licenses as f64) * 100.0;
        }
        Ok(report)
    }

    /// Expired or over-utilized licenses, with whether each is expired.
    fn risky_licenses(
        &self,
        snapshot: &StoreSnapshot,
        now: DateTime<Utc>,
    ) -> HashMap<LicenseId, bool> {
        let usage = seat_usage(snapshot);
        snapshot
            .licenses
            .iter()
            .filter_map(|l| {
                let expired = l.is_expired(now);
                let overused = over_threshold(
                    usage.get(&l.id).copied().unwrap_or(0),
                    l.total_seats,
                    self.config.over_utilization_threshold,
                );
                (expired || overused).then_some((l.id, expired))
            })
            .collect()
    }

    /// Every condition present right now, keyed for marker bookkeeping.
    fn current_conditions(
        &self,
        snapshot: &StoreSnapshot,
        now: DateTime<Utc>,
    ) -> HashMap<(AlertSubject, AlertCondition), AlertEvent> {
        let usage = seat_usage(snapshot);
        let mut conditions = HashMap::new();

        for license in &snapshot.licenses {
            if license.expires_within(now, self.config.expiry_warning_days) {
                let days = license.days_until_expiry(now);
                let event = AlertEvent {
                    subject: AlertSubject::License(license.id),
                    condition: AlertCondition::ExpiringSoon,
                    severity: expiry_severity(days),
                    detected_at: now,
                    message: format!(
                        "{} ({}) expires in {} day(s)",
                        license.product, license.key, days
                    ),
                };
                conditions.insert(
                    (event.subject.clone(), AlertCondition::ExpiringSoon),
                    event,
                );
            }

            let used = usage.get(&license.id).copied().unwrap_or(0);
            if over_threshold(used, license.total_seats, self.config.over_utilization_threshold)
            {
                let utilization = Utilization {
                    license_id: license.id,
                    used: used as u32,
                    total_seats: license.total_seats,
                };
                let event = AlertEvent {
                    subject: AlertSubject::License(license.id),
                    condition: AlertCondition::OverUtilized,
                    severity: usage_severity(utilization.fraction()),
                    detected_at: now,
                    message: format!(
                        "{} ({}) at {:.0}% capacity ({}/{} seats)",
                        license.product,
                        license.key,
                        utilization.percent(),
                        used,
                        license.total_seats
                    ),
                };
                conditions.insert(
                    (event.subject.clone(), AlertCondition::OverUtilized),
                    event,
                );
            }
        }

        let risky = self.risky_licenses(snapshot, now);
        for device in &snapshot.devices {
            if device.status == DeviceStatus::Decommissioned {
                continue;
            }
            let mut expired = 0usize;
            let mut overused = 0usize;
            for assignment in &snapshot.assignments {
                if assignment.device_id != device.id || !assignment.is_active() {
                    continue;
                }
                match risky.get(&assignment.license_id) {
                    Some(true) => expired += 1,
                    Some(false) => overused += 1,
                    None => {}
                }
            }
            if expired + overused == 0 {
                continue;
            }
            let severity = if expired > 0 {
                AlertSeverity::Critical
            } else {
                AlertSeverity::High
            };
            let event = AlertEvent {
                subject: AlertSubject::Device(device.id.clone()),
                condition: AlertCondition::DeviceAtRisk,
                severity,
                detected_at: now,
                message: format!(
                    "device {} holds {} expired and {} over-utilized license(s)",
                    device.id, expired, overused
                ),
            };
            conditions.insert(
                (event.subject.clone(), AlertCondition::DeviceAtRisk),
                event,
            );
        }

        conditions
    }
}

/// Active seats per license across the snapshot.
fn seat_usage(snapshot: &StoreSnapshot) -> HashMap<LicenseId, usize> {
    let mut usage: HashMap<LicenseId, usize> = HashMap::new();
    for assignment in &snapshot.assignments {
        if assignment.is_active() {
            *usage.entry(assignment.license_id).or_default() += 1;
        }
    }
    usage
}

fn over_threshold(used: usize, total_seats: u32, threshold: f64) -> bool {
    if total_seats == 0 {
        return false;
    }
    (used as f64 / f64::from(total_seats)) >= threshold
}

fn expiry_severity(days_until_expiry: i64) -> AlertSeverity {
    if days_until_expiry <= 7 {
        AlertSeverity::Critical
    } else if days_until_expiry <= 15 {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    }
}

fn usage_severity(fraction: f64) -> AlertSeverity {
    if fraction >= 0.95 {
        AlertSeverity::Critical
    } else {
        AlertSeverity::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Assignment, Device, DeviceType, License};
    use crate::types::{AssignmentId, DeviceId, VendorId};
    use chrono::Duration;
    use uuid::Uuid;

    fn service() -> (ComplianceService, EntityStore) {
        let store = EntityStore::new();
        (
            ComplianceService::new(store.clone(), CoreConfig::default()),
            store,
        )
    }

    fn license(key: &str, seats: u32, valid_until: DateTime<Utc>) -> License {
        let now = Utc::now();
        License {
            id: LicenseId::new(),
            key: key.to_string(),
            product: "NetOS".to_string(),
            vendor_id: VendorId::new(),
            total_seats: seats,
            valid_from: now - Duration::days(365),
            valid_until,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn device(id: &str, status: DeviceStatus) -> Device {
        let now = Utc::now();
        Device {
            id: DeviceId::new(id),
            kind: DeviceType::Switch,
            ip_address: "10.0.0.1".parse().unwrap(),
            location: "DC-1".to_string(),
            model: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn assignment(license_id: LicenseId, device_id: &DeviceId) -> Assignment {
        Assignment {
            id: AssignmentId::new(),
            license_id,
            device_id: device_id.clone(),
            assigned_by: Uuid::new_v4(),
            assigned_at: Utc::now(),
            revoked_at: None,
        }
    }

    async fn seed(store: &EntityStore, f: impl FnOnce(&mut crate::store::StoreTx)) {
        let mut tx = store.begin().await.unwrap();
        f(&mut tx);
        tx.commit();
    }

    #[tokio::test]
    async fn utilization_counts_active_seats_only() {
        let (service, store) = service();
        let now = Utc::now();
        let lic = license("LIC-1", 4, now + Duration::days(90));
        let lic_id = lic.id;
        let dev = device("SW-1", DeviceStatus::Active);
        let dev_id = dev.id.clone();

        seed(&store, |tx| {
            tx.insert_license(lic);
            tx.insert_device(dev);
            tx.insert_assignment(assignment(lic_id, &dev_id));
            let mut revoked = assignment(lic_id, &DeviceId::new("SW-2"));
            revoked.revoked_at = Some(Utc::now());
            tx.insert_assignment(revoked);
        })
        .await;

        let utilization = service.utilization(lic_id).await.unwrap();
        assert_eq!(utilization.used, 1);
        assert_eq!(utilization.total_seats, 4);
        assert_eq!(service.band(&utilization), UtilizationBand::Ok);
    }

    #[tokio::test]
    async fn unknown_license_is_not_found() {
        let (service, _) = service();
        let err = service.utilization(LicenseId::new()).await.unwrap_err();
        assert!(matches!(err, LicensingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn bands_follow_configured_thresholds() {
        let (service, _) = service();
        let at = |used, total| Utilization {
            license_id: LicenseId::new(),
            used,
            total_seats: total,
        };
        assert_eq!(service.band(&at(5, 10)), UtilizationBand::Ok);
        assert_eq!(service.band(&at(7, 10)), UtilizationBand::Warning);
        assert_eq!(service.band(&at(9, 10)), UtilizationBand::Critical);
        assert_eq!(service.band(&at(10, 10)), UtilizationBand::Critical);
    }

    #[tokio::test]
    async fn expiring_orders_by_soonest_and_excludes_out_of_window() {
        let (service, store) = service();
        let now = Utc::now();
        seed(&store, |tx| {
            tx.insert_license(license("LIC-10D", 1, now + Duration::days(10)));
            tx.insert_license(license("LIC-40D", 1, now + Duration::days(40)));
            tx.insert_license(license("LIC-5D", 1, now + Duration::days(5)));
        })
        .await;

        let expiring = service.expiring(30).await.unwrap();
        let keys: Vec<_> = expiring.iter().map(|l| l.key.as_str()).collect();
        assert_eq!(keys, ["LIC-5D", "LIC-10D"]);
    }

    #[tokio::test]
    async fn at_risk_flags_holders_of_expired_or_overused_licenses() {
        let (service, store) = service();
        let now = Utc::now();

        let expired = license("LIC-EXPIRED", 5, now - Duration::days(1));
        let expired_id = expired.id;
        let full = license("LIC-FULL", 1, now + Duration::days(90));
        let full_id = full.id;
        let healthy = license("LIC-OK", 10, now + Duration::days(90));
        let healthy_id = healthy.id;

        let holder_a = device("SW-A", DeviceStatus::Active);
        let holder_b = device("SW-B", DeviceStatus::Active);
        let clean = device("SW-CLEAN", DeviceStatus::Active);
        let retired = device("SW-RETIRED", DeviceStatus::Decommissioned);
        let (a_id, b_id) = (holder_a.id.clone(), holder_b.id.clone());
        let (clean_id, retired_id) = (clean.id.clone(), retired.id.clone());

        seed(&store, |tx| {
            tx.insert_license(expired);
            tx.insert_license(full);
            tx.insert_license(healthy);
            tx.insert_device(holder_a);
            tx.insert_device(holder_b);
            tx.insert_device(clean);
            tx.insert_device(retired);
            tx.insert_assignment(assignment(expired_id, &a_id));
            tx.insert_assignment(assignment(full_id, &b_id));
            tx.insert_assignment(assignment(healthy_id, &clean_id));
            tx.insert_assignment(assignment(expired_id, &retired_id));
        })
        .await;

        let at_risk = service.at_risk_devices().await.unwrap();
        let ids: Vec<_> = at_risk.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["SW-A", "SW-B"]);
    }

    #[tokio::test]
    async fn evaluate_alerts_is_idempotent_until_state_changes() {
        let (service, store) = service();
        let now = Utc::now();
        let lic = license("LIC-SOON", 1, now + Duration::days(10));
        seed(&store, |tx| {
            tx.insert_license(lic);
        })
        .await;

        let first = service.evaluate_alerts().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].condition, AlertCondition::ExpiringSoon);
        // 10 days out truncates to 9 whole days, inside the high band
        assert_eq!(first[0].severity, AlertSeverity::High);

        let second = service.evaluate_alerts().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn cleared_condition_rearms_and_fires_again() {
        let (service, store) = service();
        let now = Utc::now();
        let lic = license("LIC-SOON", 1, now + Duration::days(10));
        let lic_id = lic.id;
        let renewed = License {
            valid_until: now + Duration::days(200),
            ..lic.clone()
        };
        let relapsed = lic.clone();
        seed(&store, |tx| {
            tx.insert_license(lic);
        })
        .await;

        assert_eq!(service.evaluate_alerts().await.unwrap().len(), 1);

        // renewal pushes the license out of the warning window
        seed(&store, |tx| {
            tx.update_license(renewed);
        })
        .await;
        assert!(service.evaluate_alerts().await.unwrap().is_empty());

        // re-entering the window signals again
        seed(&store, |tx| {
            tx.update_license(relapsed);
        })
        .await;
        let third = service.evaluate_alerts().await.unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(
            third[0].subject,
            AlertSubject::License(lic_id)
        );
    }

    #[tokio::test]
    async fn over_utilization_triggers_at_the_threshold() {
        let (service, store) = service();
        let now = Utc::now();
        let lic = license("LIC-BUSY", 10, now + Duration::days(200));
        let lic_id = lic.id;
        seed(&store, |tx| {
            tx.insert_license(lic);
            for i in 0..9 {
                let dev_id = DeviceId::new(format!("SW-{i}"));
                tx.insert_assignment(assignment(lic_id, &dev_id));
            }
        })
        .await;

        let events = service.evaluate_alerts().await.unwrap();
        let over: Vec<_> = events
            .iter()
            .filter(|e| e.condition == AlertCondition::OverUtilized)
            .collect();
        assert_eq!(over.len(), 1);
        assert_eq!(over[0].severity, AlertSeverity::High);
        assert!(over[0].message.contains("90%"));
    }

    #[tokio::test]
    async fn fully_used_license_is_critical() {
        let (service, store) = service();
        let now = Utc::now();
        let lic = license("LIC-MAXED", 2, now + Duration::days(200));
        let lic_id = lic.id;
        seed(&store, |tx| {
            tx.insert_license(lic);
            tx.insert_assignment(assignment(lic_id, &DeviceId::new("SW-1")));
            tx.insert_assignment(assignment(lic_id, &DeviceId::new("SW-2")));
        })
        .await;

        let events = service.evaluate_alerts().await.unwrap();
        let over = events
            .iter()
            .find(|e| e.condition == AlertCondition::OverUtilized)
            .expect("over-utilization alert");
        assert_eq!(over.severity, AlertSeverity::Critical);
    }

    #[tokio::test]
    async fn device_at_risk_alert_includes_counts() {
        let (service, store) = service();
        let now = Utc::now();
        let expired = license("LIC-EXPIRED", 5, now - Duration::days(2));
        let expired_id = expired.id;
        let holder = device("SW-A", DeviceStatus::Active);
        let holder_id = holder.id.clone();
        seed(&store, |tx| {
            tx.insert_license(expired);
            tx.insert_device(holder);
            tx.insert_assignment(assignment(expired_id, &holder_id));
        })
        .await;

        let events = service.evaluate_alerts().await.unwrap();
        let at_risk = events
            .iter()
            .find(|e| e.condition == AlertCondition::DeviceAtRisk)
            .expect("device-at-risk alert");
        assert_eq!(at_risk.severity, AlertSeverity::Critical);
        assert_eq!(at_risk.subject, AlertSubject::Device(holder_id));
        assert!(at_risk.message.contains("1 expired"));
    }

    #[tokio::test]
    async fn report_buckets_by_expiry_and_usage() {
        let (service, store) = service();
        let now = Utc::now();
        let full = license("LIC-FULL", 1, now + Duration::days(90));
        let full_id = full.id;
        seed(&store, |tx| {
            tx.insert_license(license("LIC-VALID", 10, now + Duration::days(365)));
            tx.insert_license(license("LIC-30", 10, now + Duration::days(20)));
            tx.insert_license(license("LIC-60", 10, now + Duration::days(45)));
            tx.insert_license(license("LIC-DEAD", 10, now - Duration::days(5)));
            tx.insert_license(full);
            tx.insert_assignment(assignment(full_id, &DeviceId::new("SW-1")));
        })
        .await;

        let report = service.report().await.unwrap();
        assert_eq!(report.total_licenses, 5);
        assert_eq!(report.valid, 2); // LIC-VALID and LIC-FULL
        assert_eq!(report.expiring_within_30_days, 1);
        assert_eq!(report.expiring_within_60_days, 1);
        assert_eq!(report.expired, 1);
        assert_eq!(report.over_utilized, 1);
        assert!((report.compliance_rate - 40.0).abs() < f64::EPSILON);
    }
}
