use racer_core::{ReservableSlot, Ticket, WindowSource};

/// Why a ticket cannot race a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    /// The scheduled follow-up window is restricted to VIP tickets.
    NextWindowVipOnly,
    /// The slot's own window is restricted to VIP tickets.
    VipOnly,
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NextWindowVipOnly => write!(f, "next window is VIP-only, ticket is not VIP"),
            Self::VipOnly => write!(f, "slot is VIP-only, ticket is not VIP"),
        }
    }
}

/// Check whether `ticket` may race `slot`.
///
/// Only the governing window is consulted: when a follow-up window is
/// scheduled its VIP flag decides, and the slot's own flag is ignored.
pub fn check_eligibility(slot: &ReservableSlot, ticket: &Ticket) -> Result<(), Ineligibility> {
    let window = slot.governing_window();
    if !window.requires_vip || ticket.is_vip() {
        return Ok(());
    }
    Err(match window.source {
        WindowSource::Next => Ineligibility::NextWindowVipOnly,
        WindowSource::Current => Ineligibility::VipOnly,
    })
}

pub fn is_eligible(slot: &ReservableSlot, ticket: &Ticket) -> bool {
    check_eligibility(slot, ticket).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use racer_core::NextSlot;

    fn slot(vip_flag: i32, next: Option<NextSlot>) -> ReservableSlot {
        ReservableSlot {
            id: 6016,
            name: "Stage A".to_string(),
            open_time: 1_720_760_400,
            next,
            vip_flag,
        }
    }

    fn ticket(category: &str) -> Ticket {
        Ticket {
            id: "15111332527932".to_string(),
            category: category.to_string(),
            label: "7月12日".to_string(),
        }
    }

    #[test]
    fn test_open_slot_accepts_any_ticket() {
        assert!(is_eligible(&slot(0, None), &ticket("单日票")));
        assert!(is_eligible(&slot(0, None), &ticket("单日票 VIP")));
    }

    #[test]
    fn test_vip_slot_rejects_regular_ticket() {
        assert_eq!(
            check_eligibility(&slot(1, None), &ticket("单日票")),
            Err(Ineligibility::VipOnly)
        );
        assert!(is_eligible(&slot(1, None), &ticket("单日票 VIP")));
    }

    #[test]
    fn test_scheduled_next_window_governs() {
        let next = NextSlot {
            open_time: 1_720_764_000,
            vip_flag: 1,
        };
        assert_eq!(
            check_eligibility(&slot(0, Some(next)), &ticket("单日票")),
            Err(Ineligibility::NextWindowVipOnly)
        );
    }

    #[test]
    fn test_scheduled_open_next_window_overrides_vip_slot() {
        let next = NextSlot {
            open_time: 1_720_764_000,
            vip_flag: 0,
        };
        assert!(is_eligible(&slot(1, Some(next)), &ticket("单日票")));
    }

    #[test]
    fn test_unscheduled_next_window_is_ignored() {
        let next = NextSlot {
            open_time: 0,
            vip_flag: 1,
        };
        assert!(is_eligible(&slot(0, Some(next.clone())), &ticket("单日票")));
        assert_eq!(
            check_eligibility(&slot(1, Some(next)), &ticket("单日票")),
            Err(Ineligibility::VipOnly)
        );
    }

    #[test]
    fn test_ineligibility_display() {
        assert_eq!(
            Ineligibility::VipOnly.to_string(),
            "slot is VIP-only, ticket is not VIP"
        );
    }

    proptest! {
        #[test]
        fn prop_vip_ticket_always_eligible(
            vip_flag in any::<i32>(),
            next_open in prop_oneof![Just(0i64), 1i64..2_000_000_000],
            next_vip in any::<i32>(),
        ) {
            let next = NextSlot { open_time: next_open, vip_flag: next_vip };
            prop_assert!(is_eligible(&slot(vip_flag, Some(next)), &ticket("双日票 VIP")));
        }

        #[test]
        fn prop_regular_ticket_follows_governing_flag(
            vip_flag in any::<i32>(),
            next_open in prop_oneof![Just(0i64), 1i64..2_000_000_000],
            next_vip in any::<i32>(),
        ) {
            let next = NextSlot { open_time: next_open, vip_flag: next_vip };
            let governing = if next_open != 0 { next_vip } else { vip_flag };
            prop_assert_eq!(
                is_eligible(&slot(vip_flag, Some(next)), &ticket("单日票")),
                governing == 0
            );
        }
    }
}
