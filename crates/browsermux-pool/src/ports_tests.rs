
use super::*;

#[test]
fn acquires_lowest_port_first() {
    let pool = PortPool::new(9222, 3);
    assert_eq!(pool.acquire().unwrap(), 9222);
    assert_eq!(pool.acquire().unwrap(), 9223);
    assert_eq!(pool.acquire().unwrap(), 9224);
}

#[test]
fn exhaustion_surfaces_after_full_drain() {
    let pool = PortPool::new(9222, 2);
    pool.acquire().unwrap();
    pool.acquire().unwrap();
    assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted)));
}

#[test]
fn released_ports_become_acquirable_again() {
    let pool = PortPool::new(9222, 2);
    let a = pool.acquire().unwrap();
    pool.acquire().unwrap();
    pool.release(a).unwrap();
    assert_eq!(pool.acquire().unwrap(), a);
}

#[test]
fn releasing_unacquired_port_is_invalid() {
    let pool = PortPool::new(9222, 2);
    assert!(matches!(pool.release(9222), Err(PoolError::InvalidPort(9222))));
}

#[test]
fn releasing_out_of_range_port_is_invalid() {
    let pool = PortPool::new(9222, 2);
    assert!(matches!(pool.release(9300), Err(PoolError::InvalidPort(9300))));
}

#[test]
fn double_release_is_invalid() {
    let pool = PortPool::new(9222, 2);
    let port = pool.acquire().unwrap();
    pool.release(port).unwrap();
    assert!(matches!(pool.release(port), Err(PoolError::InvalidPort(_))));
}

#[test]
fn specific_acquire_takes_exactly_that_port() {
    let pool = PortPool::new(9222, 3);
    pool.acquire_port(9223).unwrap();
    assert_eq!(pool.acquire().unwrap(), 9222);
    assert_eq!(pool.acquire().unwrap(), 9224);
}

#[test]
fn specific_acquire_of_taken_port_is_invalid() {
    let pool = PortPool::new(9222, 3);
    pool.acquire_port(9223).unwrap();
    assert!(matches!(pool.acquire_port(9223), Err(PoolError::InvalidPort(9223))));
}

// Port conservation: whatever interleaving of acquires and releases runs, the
// allocated set plus the free set always equals the original range.
#[test]
fn conservation_across_interleavings() {
    let pool = PortPool::new(9222, 8);
    let mut held = Vec::new();

    for round in 0..50u32 {
        if round % 3 == 0 && !held.is_empty() {
            let port = held.remove((round as usize) % held.len());
            pool.release(port).unwrap();
        } else if let Ok(port) = pool.acquire() {
            held.push(port);
        }

        let stats = pool.stats();
        assert_eq!(stats.available + held.len(), stats.total);
        // No port is ever both held and free.
        for port in &held {
            assert!(matches!(pool.acquire_port(*port), Err(PoolError::InvalidPort(_))));
        }
    }

    for port in held {
        pool.release(port).unwrap();
    }
    assert_eq!(pool.stats().available, 8);
}
