use crate::models::BookingNotice;

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn when(notice: &BookingNotice) -> (String, String) {
    (
        notice.date.format("%B %-d, %Y").to_string(),
        format!("{} - {}", notice.slot.start.spoken(), notice.slot.end.spoken()),
    )
}

pub fn patient_confirmation(notice: &BookingNotice) -> (String, String) {
    let (date, time) = when(notice);
    let subject = format!("Appointment booked with {}", notice.doctor_name);
    let html = format!(
        "<h2>Your appointment is booked</h2>\
         <p>Hello {patient},</p>\
         <p>Your appointment with <strong>{doctor}</strong> ({department}) is scheduled for \
         <strong>{date}</strong> at <strong>{time}</strong>.</p>\
         <p>The doctor will confirm it shortly. Reference: {id}</p>",
        patient = escape_html(&notice.patient_name),
        doctor = escape_html(&notice.doctor_name),
        department = escape_html(&notice.specialization),
        date = date,
        time = time,
        id = notice.appointment_id,
    );
    (subject, html)
}

pub fn doctor_confirmation(notice: &BookingNotice) -> (String, String) {
    let (date, time) = when(notice);
    let subject = format!("New appointment request from {}", notice.patient_name);
    let html = format!(
        "<h2>New appointment request</h2>\
         <p>Hello {doctor},</p>\
         <p><strong>{patient}</strong> booked <strong>{date}</strong> at <strong>{time}</strong>.</p>\
         <p>Please confirm or cancel it from your dashboard. Reference: {id}</p>",
        doctor = escape_html(&notice.doctor_name),
        patient = escape_html(&notice.patient_name),
        date = date,
        time = time,
        id = notice.appointment_id,
    );
    (subject, html)
}
