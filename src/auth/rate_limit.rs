/*
 * This file is part of the Obvia ERP.
 *
 * Copyright (C) 2025 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use dashmap::DashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// `/api/auth/login` is rate-limited to 5 attempts per 15 minutes per IP (§6).
/// A sliding window of attempt timestamps per IP, pruned lazily on each check.
pub struct LoginRateLimiter {
    attempts: DashMap<IpAddr, Vec<Instant>>,
    max_attempts: usize,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            max_attempts,
            window,
        }
    }

    /// Records an attempt and returns whether the caller is still within budget.
    pub fn check_and_record(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut entry = self.attempts.entry(ip).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        if entry.len() >= self.max_attempts {
            return false;
        }
        entry.push(now);
        true
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(15 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_configured_limit() {
        let limiter = LoginRateLimiter::new(2, Duration::from_secs(60));
        let ip = IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1));
        assert!(limiter.check_and_record(ip));
        assert!(limiter.check_and_record(ip));
        assert!(!limiter.check_and_record(ip));
    }

    #[test]
    fn tracks_ips_independently() {
        let limiter = LoginRateLimiter::new(1, Duration::from_secs(60));
        let a = IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1));
        let b = IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 2));
        assert!(limiter.check_and_record(a));
        assert!(limiter.check_and_record(b));
        assert!(!limiter.check_and_record(a));
    }
}
