//! # Transport
//!
//! School bus routes and the students riding them.
//!
//! A student rides at most one route (`Student::transport_route_id`).
//! Deleting a route unassigns its students instead of failing.

use crate::error::{CoreError, Result, require};
use crate::form;
use crate::money::Money;
use crate::storage::{Reader, Tx};
use crate::students::Student;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRoute {
    pub id: u64,
    pub route_name: String,
    pub route_code: Option<String>,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub distance_km: Option<f64>,
    pub monthly_fee: Option<Money>,
    pub annual_fee: Option<Money>,
    pub vehicle_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub description: Option<String>,
    pub active: bool,
}

crate::record!(TransportRoute, "transport_routes", "TransportRoute");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInput {
    pub route_name: String,
    #[serde(default)]
    pub route_code: Option<String>,
    #[serde(default)]
    pub from_location: Option<String>,
    #[serde(default)]
    pub to_location: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub monthly_fee: Option<Money>,
    #[serde(default)]
    pub annual_fee: Option<Money>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RouteInput {
    fn validate(&self, r: &impl Reader, id: u64) -> Result<()> {
        require(&self.route_name, "Route name")?;
        if self.distance_km.is_some_and(|d| d.is_sign_negative()) {
            return Err(CoreError::validation("Distance cannot be negative"));
        }
        if self
            .monthly_fee
            .iter()
            .chain(self.annual_fee.iter())
            .any(|m| *m < Money::ZERO)
        {
            return Err(CoreError::validation("Route fees cannot be negative"));
        }
        if let Some(code) = form::clean(self.route_code.clone()) {
            let taken = r.find::<TransportRoute>(|t| {
                t.id != id && t.route_code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(&code))
            })?;
            if taken.is_some() {
                return Err(CoreError::conflict(format!(
                    "Route code already exists: {code}"
                )));
            }
        }
        Ok(())
    }

    fn into_route(self, id: u64) -> TransportRoute {
        TransportRoute {
            id,
            route_name: self.route_name.trim().to_string(),
            route_code: form::clean(self.route_code),
            from_location: form::clean(self.from_location),
            to_location: form::clean(self.to_location),
            distance_km: self.distance_km,
            monthly_fee: self.monthly_fee,
            annual_fee: self.annual_fee,
            vehicle_number: form::clean(self.vehicle_number),
            driver_name: form::clean(self.driver_name),
            driver_phone: form::clean(self.driver_phone),
            description: form::clean(self.description),
            active: self.active,
        }
    }
}

pub fn active_routes(r: &impl Reader) -> Result<Vec<TransportRoute>> {
    r.filter::<TransportRoute>(|t| t.active)
}

/// Create a route. Without an annual fee it is twelve monthly fees.
pub fn create_route(tx: &mut Tx, mut input: RouteInput) -> Result<TransportRoute> {
    input.validate(tx, 0)?;
    if input.annual_fee.is_none() {
        input.annual_fee = input.monthly_fee.map(|m| m.saturating_mul(12));
    }
    tx.insert(input.into_route(0))
}

/// Replace every field of a route, annual fee included.
pub fn update_route(tx: &mut Tx, id: u64, input: RouteInput) -> Result<TransportRoute> {
    tx.ensure::<TransportRoute>(id)?;
    input.validate(tx, id)?;
    let route = input.into_route(id);
    tx.put(&route)?;
    Ok(route)
}

/// Delete a route after unassigning every student on it.
pub fn delete_route(tx: &mut Tx, id: u64) -> Result<()> {
    tx.ensure::<TransportRoute>(id)?;
    for mut student in students_on_route(tx, id)? {
        student.transport_route_id = None;
        tx.put(&student)?;
    }
    tx.remove::<TransportRoute>(id)?;
    Ok(())
}

pub fn students_on_route(r: &impl Reader, route_id: u64) -> Result<Vec<Student>> {
    r.ensure::<TransportRoute>(route_id)?;
    r.filter::<Student>(|s| s.transport_route_id == Some(route_id))
}

/// Put a student on a route, or take them off with `None`.
pub fn assign_route(tx: &mut Tx, student_id: u64, route_id: Option<u64>) -> Result<Student> {
    let mut student = tx.fetch::<Student>(student_id)?;
    if let Some(route) = route_id {
        tx.ensure::<TransportRoute>(route)?;
    }
    student.transport_route_id = route_id;
    tx.put(&student)?;
    Ok(student)
}

// =============================================================================
// TESTS
// =============================================================================
