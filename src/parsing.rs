pub fn parse_cpu_to_millicores(q: &str) -> Option<i64> {
    let q = q.trim();
    if q.is_empty() {
        return None;
    }
    if let Some(stripped) = q.strip_suffix('n') {
        if let Ok(nanos) = stripped.parse::<i128>() {
            return Some((nanos / 1_000_000) as i64);
        }
    } else if let Some(stripped) = q.strip_suffix('u') {
        if let Ok(micros) = stripped.parse::<i128>() {
            return Some((micros / 1_000) as i64);
        }
    } else if let Some(stripped) = q.strip_suffix('m') {
        if let Ok(mc) = stripped.parse::<i64>() {
            return Some(mc);
        }
    } else {
        // treat as cores; can be integer or float
        if let Ok(cores) = q.parse::<f64>() {
            return Some((cores * 1000.0).round() as i64);
        }
    }
    None
}

pub fn parse_memory_to_bytes(q: &str) -> Option<i64> {
    let q = q.trim();
    if q.is_empty() {
        return None;
    }

    // Order matters: check binary suffixes first (Ki, Mi, ...), then decimal (K, M, ...)
    const BINARY_UNITS: &[(&str, i64)] = &[
        ("Ki", 1024),
        ("Mi", 1024 * 1024),
        ("Gi", 1024 * 1024 * 1024),
        ("Ti", 1024_i64.pow(4)),
        ("Pi", 1024_i64.pow(5)),
        ("Ei", 1024_i64.pow(6)),
    ];
    const DECIMAL_UNITS: &[(&str, i64)] = &[
        ("K", 1000),
        ("M", 1000 * 1000),
        ("G", 1000 * 1000 * 1000),
        ("T", 1000_i64.pow(4)),
        ("P", 1000_i64.pow(5)),
        ("E", 1000_i64.pow(6)),
        ("k", 1000),
    ];

    for (suf, mul) in BINARY_UNITS {
        if let Some(stripped) = q.strip_suffix(suf) {
            if let Ok(v) = stripped.parse::<f64>() {
                return Some((v * (*mul as f64)).round() as i64);
            }
        }
    }
    for (suf, mul) in DECIMAL_UNITS {
        if let Some(stripped) = q.strip_suffix(suf) {
            if let Ok(v) = stripped.parse::<f64>() {
                return Some((v * (*mul as f64)).round() as i64);
            }
        }
    }
    // bytes without suffix
    if let Ok(v) = q.parse::<i64>() {
        return Some(v);
    }
    None
}

/// `used / capacity * 100`, or `None` when the capacity is unknown or zero.
/// No rounding happens here; rounding is a display concern.
pub fn usage_percent(used: i64, capacity: i64) -> Option<f64> {
    if capacity <= 0 {
        return None;
    }
    Some(used as f64 / capacity as f64 * 100.0)
}

/// Strict comparison: a value equal to the threshold is not a breach.
pub fn exceeds(value: f64, threshold: f64) -> bool {
    value > threshold
}

pub fn millicores_to_cores(millicores: i64) -> f64 {
    millicores as f64 / 1000.0
}

pub fn bytes_to_gib(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

/// Last line of a log blob, ignoring a trailing newline. `None` for an empty log.
pub fn last_log_line(log: &str) -> Option<String> {
    log.lines().last().map(|l| l.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu_to_millicores() {
        // Test nanoseconds
        assert_eq!(parse_cpu_to_millicores("1000000000n"), Some(1000));
        assert_eq!(parse_cpu_to_millicores("500000000n"), Some(500));
        
        // Test microseconds
        assert_eq!(parse_cpu_to_millicores("1000000u"), Some(1000));
        assert_eq!(parse_cpu_to_millicores("500000u"), Some(500));
        
        // Test millicores
        assert_eq!(parse_cpu_to_millicores("100m"), Some(100));
        assert_eq!(parse_cpu_to_millicores("1500m"), Some(1500));
        
        // Test cores (as float)
        assert_eq!(parse_cpu_to_millicores("1"), Some(1000));
        assert_eq!(parse_cpu_to_millicores("0.5"), Some(500));
        assert_eq!(parse_cpu_to_millicores("2.5"), Some(2500));
        
        // Test invalid inputs
        assert_eq!(parse_cpu_to_millicores(""), None);
        assert_eq!(parse_cpu_to_millicores("invalid"), None);
        assert_eq!(parse_cpu_to_millicores("100x"), None);
    }

    #[test]
    fn test_parse_memory_to_bytes() {
        // Test binary units
        assert_eq!(parse_memory_to_bytes("1Ki"), Some(1024));
        assert_eq!(parse_memory_to_bytes("1Mi"), Some(1024 * 1024));
        assert_eq!(parse_memory_to_bytes("1Gi"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_to_bytes("2.5Mi"), Some((2.5 * 1024.0 * 1024.0) as i64));
        
        // Test decimal units
        assert_eq!(parse_memory_to_bytes("1K"), Some(1000));
        assert_eq!(parse_memory_to_bytes("1M"), Some(1000 * 1000));
        assert_eq!(parse_memory_to_bytes("1G"), Some(1000 * 1000 * 1000));
        assert_eq!(parse_memory_to_bytes("1k"), Some(1000)); // lowercase k
        
        // Test bytes without suffix
        assert_eq!(parse_memory_to_bytes("1024"), Some(1024));
        assert_eq!(parse_memory_to_bytes("500"), Some(500));
        
        // Test invalid inputs
        assert_eq!(parse_memory_to_bytes(""), None);
        assert_eq!(parse_memory_to_bytes("invalid"), None);
        assert_eq!(parse_memory_to_bytes("100X"), None);
    }

    #[test]
    fn test_usage_percent() {
        assert_eq!(usage_percent(500, 1000), Some(50.0));
        assert_eq!(usage_percent(2000, 1000), Some(200.0));
        assert_eq!(usage_percent(0, 1000), Some(0.0));
        assert_eq!(usage_percent(500, 0), None);
        assert_eq!(usage_percent(500, -1), None);

        // 4Gi used of 8Gi allocatable
        let used = parse_memory_to_bytes("4Gi").unwrap();
        let alloc = parse_memory_to_bytes("8388608Ki").unwrap();
        assert_eq!(usage_percent(used, alloc), Some(50.0));
    }

    #[test]
    fn test_exceeds_is_strict() {
        assert!(!exceeds(85.0, 85.0));
        assert!(exceeds(85.01, 85.0));
        assert!(!exceeds(84.99, 85.0));
    }

    #[test]
    fn test_display_conversions() {
        assert_eq!(millicores_to_cores(1500), 1.5);
        assert_eq!(bytes_to_gib(1024 * 1024 * 1024), 1.0);
        assert_eq!(bytes_to_gib(parse_memory_to_bytes("16Gi").unwrap()), 16.0);
    }

    #[test]
    fn test_last_log_line() {
        assert_eq!(last_log_line("only line"), Some("only line".to_string()));
        assert_eq!(last_log_line("first\nsecond\nthird\n"), Some("third".to_string()));
        assert_eq!(last_log_line("a\r\nb"), Some("b".to_string()));
        assert_eq!(last_log_line(""), None);
    }
}
