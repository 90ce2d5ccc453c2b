pub mod units;

pub const CACHELINE_SIZE: usize = 64;
pub const PAGE_SIZE: usize = 4096;

const COUNTER_SIZE: usize = core::mem::size_of::<u64>();
pub const COUNTERS_PER_CACHELINE: usize = CACHELINE_SIZE / COUNTER_SIZE;

pub fn whole_cachelines<T>(count: usize) -> usize {
    (count * core::mem::size_of::<T>()).div_ceil(CACHELINE_SIZE)
}

pub fn whole_pages<T>(count: usize) -> usize {
    (count * core::mem::size_of::<T>()).div_ceil(PAGE_SIZE)
}

/// Returns the set of possible CPU ids for this host. Used by the loader to
/// size per-CPU banks; hooks never call this.
pub fn cpus() -> Result<Vec<usize>, std::io::Error> {
    let raw = std::fs::read_to_string("/sys/devices/system/cpu/possible")
        .map(|v| v.trim().to_string())?;

    parse_cpu_list(&raw)
}

fn parse_cpu_list(raw: &str) -> Result<Vec<usize>, std::io::Error> {
    let mut ids = Vec::new();

    for range in raw.split(',') {
        let mut parts = range.split('-');

        let first: Option<usize> = parts
            .next()
            .map(|text| text.parse())
            .transpose()
            .map_err(|_| std::io::Error::other("could not parse"))?;
        let second: Option<usize> = parts
            .next()
            .map(|text| text.parse())
            .transpose()
            .map_err(|_| std::io::Error::other("could not parse"))?;

        if parts.next().is_some() {
            // The line is invalid.
            return Err(std::io::Error::other("could not parse"));
        }

        match (first, second) {
            (Some(value), None) => ids.push(value),
            (Some(start), Some(stop)) => ids.extend(start..=stop),
            _ => continue,
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_cachelines() {
        assert_eq!(whole_cachelines::<u64>(0), 0);
        assert_eq!(whole_cachelines::<u64>(1), 1);
        assert_eq!(whole_cachelines::<u64>(8), 1);
        assert_eq!(whole_cachelines::<u64>(9), 2);
        assert_eq!(whole_cachelines::<u64>(16), 2);
    }

    #[test]
    fn test_whole_pages() {
        assert_eq!(whole_pages::<u64>(512), 1);
        assert_eq!(whole_pages::<u64>(513), 2);
    }

    #[test]
    fn test_parse_cpu_list() {
        assert_eq!(parse_cpu_list("0").unwrap(), vec![0]);
        assert_eq!(parse_cpu_list("0-3").unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(parse_cpu_list("0-1,4-5").unwrap(), vec![0, 1, 4, 5]);
        assert!(parse_cpu_list("0-1-2").is_err());
        assert!(parse_cpu_list("x").is_err());
    }
}
