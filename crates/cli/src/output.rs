//! Output formatting for identified service records

use flowprint_common::ServiceRecord;
use std::time::Duration;

/// Print records as an ASCII table (sorted by IP and port).
pub fn print_records(records: &[ServiceRecord], duration: Duration) {
    if records.is_empty() {
        println!("\nNo service records.\n");
        return;
    }

    let mut sorted: Vec<&ServiceRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.ip.cmp(&b.ip).then_with(|| a.port.cmp(&b.port)));

    println!("\n{:-<100}", "");
    println!(
        "{:<20} {:<8} {:<6} {:<12} {:<48}",
        "HOST", "PORT", "PROTO", "SERVICE", "PRODUCT/VERSION"
    );
    println!("{:-<100}", "");

    let mut identified = 0usize;
    for rec in &sorted {
        let proto = rec.transport.map(|t| t.as_str()).unwrap_or("?");
        let display = format_evidence(rec);
        if !rec.is_unidentified() {
            identified += 1;
        }
        println!(
            "{:<20} {:<8} {:<6} {:<12} {:<48}",
            rec.ip,
            rec.port,
            proto,
            if rec.name.is_empty() { "unknown" } else { rec.name.as_str() },
            display
        );
    }

    println!("{:-<100}", "");
    println!("\nSummary:");
    println!("  Records: {}", records.len());
    println!("  Identified: {}", identified);
    println!("  Unidentified: {}", records.len() - identified);
    println!("  Replay duration: {:.2?}", duration);
    println!();
}

/// One-line evidence summary: product, version, vendor, notes in order.
fn format_evidence(rec: &ServiceRecord) -> String {
    let mut parts = Vec::new();
    if !rec.product.is_empty() {
        parts.push(rec.product.clone());
    }
    if !rec.version.is_empty() {
        parts.push(format!("v[{}]", rec.version));
    }
    if !rec.vendor.is_empty() {
        parts.push(format!("by {}", rec.vendor));
    }
    if !rec.notes.is_empty() {
        parts.push(format!("({})", rec.notes));
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_line_orders_fields() {
        let mut rec = ServiceRecord::default();
        rec.product = "ssh | OpenSSH".into();
        rec.version = "8.9".into();
        rec.vendor = "OpenBSD".into();
        let line = format_evidence(&rec);
        assert_eq!(line, "ssh | OpenSSH v[8.9] by OpenBSD");
    }

    #[test]
    fn empty_evidence_is_a_dash() {
        assert_eq!(format_evidence(&ServiceRecord::default()), "-");
    }
}
