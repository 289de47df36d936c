//! Human-readable summaries of backend results.
//!
//! The text is spoken or shown verbatim, so the wording and layout here are
//! part of the user-facing contract.

use std::fmt::Write;

use chrono::DateTime;

use medibook_core::{AppointmentConfirmation, Doctor, GeocodeResult, Slot};

/// Render a doctor search result list.
pub fn render_search(doctors: &[Doctor], specialty: &str, max_listed: usize) -> String {
    if doctors.is_empty() {
        return format!(
            "I couldn't find any {specialty} doctors in your area within the search radius. Try:\n\
             - Expanding your search radius\n\
             - Checking a different specialty\n\
             - Or specify a different location"
        );
    }

    let mut out = format!(
        "I found {} doctor(s) matching your search:\n\n",
        doctors.len()
    );
    for (i, doctor) in doctors.iter().take(max_listed).enumerate() {
        let name = if doctor.name.is_empty() {
            "Unknown"
        } else {
            doctor.name.as_str()
        };
        let specialty = doctor
            .specialty
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("General Practice");
        let _ = writeln!(out, "{}. **{}** - {}", i + 1, name, specialty);
        if let Some(address) = doctor.address.as_deref().filter(|a| !a.is_empty()) {
            let _ = writeln!(out, "   📍 {address}");
        }
        if let Some(distance) = doctor.distance {
            let _ = writeln!(out, "   📏 {distance:.1} km away");
        }
        if let Some(phone) = doctor.phone.as_deref().filter(|p| !p.is_empty()) {
            let _ = writeln!(out, "   📞 {phone}");
        }
        if !doctor.id.is_empty() {
            let _ = writeln!(out, "   🆔 ID: {}", doctor.id);
        }
        out.push('\n');
    }
    if doctors.len() > max_listed {
        let _ = writeln!(out, "... and {} more doctors.", doctors.len() - max_listed);
    }
    out.push_str(
        "\nWould you like to book an appointment with one of these doctors? \
         Just let me know which doctor and your preferred time.",
    );
    out
}

/// Render the free slots returned by an availability check.
pub fn render_availability(slots: &[Slot], max_listed: usize) -> String {
    if slots.is_empty() {
        return "No available slots found in that time range. \
                Would you like to check a different time?"
            .to_string();
    }

    let mut out = format!("I found {} available time slot(s):\n\n", slots.len());
    for (i, slot) in slots.iter().take(max_listed).enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, format_slot(slot));
    }
    if slots.len() > max_listed {
        let _ = writeln!(
            out,
            "\n... and {} more slots available.",
            slots.len() - max_listed
        );
    }
    out.push_str(
        "\nWhich slot would you like to book? Just say the number (e.g., 'one', '1', 'first').",
    );
    out
}

/// Format a slot as `Saturday, March 01 at 09:00 AM - 09:30 AM`, in the
/// offset the timestamps carry. Unparseable timestamps are shown raw.
pub fn format_slot(slot: &Slot) -> String {
    match (
        DateTime::parse_from_rfc3339(&slot.start),
        DateTime::parse_from_rfc3339(&slot.end),
    ) {
        (Ok(start), Ok(end)) => format!(
            "{} - {}",
            start.format("%A, %B %d at %I:%M %p"),
            end.format("%I:%M %p")
        ),
        _ => format!("{} - {}", slot.start, slot.end),
    }
}

/// Render a booking confirmation.
pub fn render_confirmation(confirmation: &AppointmentConfirmation) -> String {
    let id = confirmation.appointment_id.as_deref().unwrap_or("unknown");
    let mut out = format!("✅ Appointment scheduled successfully!\n\n📋 Appointment ID: {id}\n");
    if let Some(link) = confirmation.calendar_link.as_deref().filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "📅 Calendar link: {link}");
    }
    out
}

/// Render a geocoding result.
pub fn render_geocode(result: &GeocodeResult, query: &str) -> String {
    let place = result
        .display_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(query);
    format!("Found location: {place}")
}
