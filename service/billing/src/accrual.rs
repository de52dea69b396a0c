//! Billing accrual: turns elapsed time past a watermark into billing records.
//!
//! Both entry points are pure: `(conf, timeline, last, now) -> (records, last')` with
//! `last' >= last`. The caller owns the watermark and persists `last'`.

use domain_billing::{
    exception::{BillingException, BillingResult},
    model::entity::{BillingKind, BillingRecord, BillingSubject, ProductConf, ResourceConf},
};
use uuid::Uuid;

use crate::timeline::{filter_timeline, Timeline};

/// Windows billed by one call at most; a watermark far behind catches up over several passes.
pub const MAX_WINDOWS_PER_PASS: usize = 1024;

/// Records produced by one accrual call and the advanced watermark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accrued {
    pub records: Vec<BillingRecord>,
    pub last: i64,
}

/// Flat subscription billing of `product`.
///
/// Postpaid bills every period fully elapsed before `now`, prepaid bills the period starting
/// at the watermark as soon as the watermark is reached.
pub fn static_billing(
    instance: Uuid,
    product: &str,
    conf: &ProductConf,
    last: i64,
    now: i64,
) -> BillingResult<Accrued> {
    check_period(product, conf.period)?;
    let subject = BillingSubject::Product(product.to_owned());
    match conf.kind {
        BillingKind::Postpaid => postpaid_windows(product, last, now, conf.period, |start, end| {
            vec![BillingRecord::new(subject.clone(), instance, start, end, start, conf.price)]
        }),
        BillingKind::Prepaid => prepaid_windows(product, last, now, conf.period, |start, end| {
            BillingRecord::new(subject.clone(), instance, start, end, start, conf.price)
        }),
    }
}

/// Capacity billing of one metered resource.
///
/// Postpaid walks the closed windows and charges every slice of the timeline spent in a
/// billable state, prorated over the period and scaled by `amount`. Prepaid charges
/// `price * amount` per upcoming period regardless of state. `amount` and `timeline` are only
/// consulted when something is billed.
pub fn capacity_billing<T, A>(
    instance: Uuid,
    conf: &ResourceConf,
    amount: A,
    timeline: &T,
    last: i64,
    now: i64,
) -> BillingResult<Accrued>
where
    T: Timeline + ?Sized,
    A: Fn() -> f64,
{
    check_period(&conf.key, conf.period)?;
    let subject = BillingSubject::Resource(conf.key.clone());
    let period = conf.period as f64;
    match conf.kind {
        BillingKind::Postpaid => postpaid_windows(&conf.key, last, now, conf.period, |start, end| {
            filter_timeline(timeline.records(), start, end)
                .into_iter()
                .filter(|slice| slice.duration() > 0 && conf.is_billable(slice.state))
                .map(|slice| {
                    let total = slice.duration() as f64 / period * conf.price * amount();
                    BillingRecord::new(
                        subject.clone(),
                        instance,
                        slice.start,
                        slice.end,
                        slice.end,
                        total,
                    )
                })
                .collect()
        }),
        BillingKind::Prepaid => prepaid_windows(&conf.key, last, now, conf.period, |start, end| {
            BillingRecord::new(subject.clone(), instance, start, end, start, conf.price * amount())
        }),
    }
}

fn check_period(target: &str, period: i64) -> BillingResult<()> {
    if period <= 0 {
        return Err(BillingException::InvalidPeriod {
            target: target.to_owned(),
            period,
        });
    }
    Ok(())
}

/// Every `[last, last + period)` window closed by `now`; the watermark moves past each one
/// even when it yields no record.
fn postpaid_windows<W>(
    target: &str,
    mut last: i64,
    now: i64,
    period: i64,
    mut bill: W,
) -> BillingResult<Accrued>
where
    W: FnMut(i64, i64) -> Vec<BillingRecord>,
{
    let mut records = vec![];
    for _ in 0..MAX_WINDOWS_PER_PASS {
        let end = window_end(target, last, period)?;
        if end > now {
            break;
        }
        records.extend(bill(last, end));
        last = end;
    }
    Ok(Accrued { records, last })
}

/// Every window starting at or before `now`, billed ahead of use.
fn prepaid_windows<W>(
    target: &str,
    mut last: i64,
    now: i64,
    period: i64,
    mut bill: W,
) -> BillingResult<Accrued>
where
    W: FnMut(i64, i64) -> BillingRecord,
{
    let mut records = vec![];
    for _ in 0..MAX_WINDOWS_PER_PASS {
        if last > now {
            break;
        }
        let end = window_end(target, last, period)?;
        records.push(bill(last, end));
        last = end;
    }
    Ok(Accrued { records, last })
}

fn window_end(target: &str, last: i64, period: i64) -> BillingResult<i64> {
    last.checked_add(period).ok_or_else(|| BillingException::PeriodOverflow {
        target: target.to_owned(),
        last,
        period,
    })
}
