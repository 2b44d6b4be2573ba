use auth_api::protection::{
    DenyReason, Mode, RequestContext, Rule, SlidingWindow, RATE_LIMIT_INTERVAL, RATE_LIMIT_MAX,
};
use std::net::{IpAddr, Ipv4Addr};
use std::thread;
use std::time::{Duration, Instant};

fn limiter() -> SlidingWindow {
    SlidingWindow::new(RATE_LIMIT_MAX, RATE_LIMIT_INTERVAL, Mode::Live)
}

fn request_from(ip: IpAddr) -> RequestContext {
    RequestContext {
        ip,
        method: "POST".to_string(),
        path: "/api/auth/sign-in".to_string(),
        query: String::new(),
        user_agent: Some("Mozilla/5.0".to_string()),
    }
}

#[test]
fn test_rate_limiter_creation() {
    let limiter = limiter();
    let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

    assert!(limiter.check(ip));
}

#[test]
fn test_rate_limit_allows_under_limit() {
    let limiter = limiter();
    let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

    // Send 5 requests (the limit)
    for _ in 0..RATE_LIMIT_MAX {
        assert!(limiter.check(ip), "Should allow requests under limit");
    }
}

#[test]
fn test_rate_limit_blocks_over_limit() {
    let limiter = limiter();
    let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

    for _ in 0..RATE_LIMIT_MAX {
        limiter.check(ip);
    }

    // 6th request should be blocked
    assert!(!limiter.check(ip), "Should block requests over limit");
}

#[test]
fn test_rate_limit_per_ip() {
    let limiter = limiter();
    let ip1 = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
    let ip2 = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2));

    // Exhaust limit for IP1
    for _ in 0..RATE_LIMIT_MAX {
        limiter.check(ip1);
    }

    // IP1 should be blocked
    assert!(!limiter.check(ip1));

    // IP2 should still be allowed
    assert!(limiter.check(ip2));
}

#[test]
fn test_window_slides_instead_of_resetting() {
    let limiter = SlidingWindow::new(2, Duration::from_secs(2), Mode::Live);
    let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    let start = Instant::now();

    assert!(limiter.check_at(ip, start));
    assert!(limiter.check_at(ip, start + Duration::from_millis(1500)));
    assert!(!limiter.check_at(ip, start + Duration::from_millis(1900)));

    // The first request has left the window, the second has not
    assert!(limiter.check_at(ip, start + Duration::from_millis(2100)));
    assert!(!limiter.check_at(ip, start + Duration::from_millis(2200)));
}

#[test]
fn test_rejected_requests_do_not_extend_the_window() {
    let limiter = SlidingWindow::new(1, Duration::from_secs(1), Mode::Live);
    let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
    let start = Instant::now();

    assert!(limiter.check_at(ip, start));
    assert!(!limiter.check_at(ip, start + Duration::from_millis(500)));
    assert!(!limiter.check_at(ip, start + Duration::from_millis(900)));
    assert!(limiter.check_at(ip, start + Duration::from_millis(1001)));
}

#[test]
fn test_rule_reports_rate_limit_denial() {
    let limiter = limiter();
    let request = request_from(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)));

    assert_eq!(limiter.name(), "sliding_window");
    for _ in 0..RATE_LIMIT_MAX {
        assert_eq!(limiter.evaluate(&request), None);
    }
    assert_eq!(limiter.evaluate(&request), Some(DenyReason::RateLimit));
}

#[test]
fn test_cleanup_old_entries() {
    let limiter = SlidingWindow::new(5, Duration::from_millis(50), Mode::Live);
    let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

    // Make some requests
    for _ in 0..3 {
        limiter.check(ip);
    }
    assert_eq!(limiter.tracked_clients(), 1);

    thread::sleep(Duration::from_millis(80));
    limiter.cleanup_old_entries();

    assert_eq!(limiter.tracked_clients(), 0);
    assert!(limiter.check(ip));
}
