//! Plugin hook dispatcher (spec §6.5).
//!
//! Plugins are not an embedded scripting engine here — they are whatever
//! Rust closures the hub wires up at startup (in-tree "plugins" such as
//! the antispam filter could register through the same table a real
//! loader would use). Each named event fires its registered callbacks in
//! registration order; a callback returning `Consumed` short-circuits
//! the rest and tells the caller to skip the default action.

use crate::handlers::context::ConnCtx;

/// The fixed named events a callback can subscribe to. Matches the
/// event set the original hub exposes to its script plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    OnNewConn,
    OnCloseConn,
    OnLogin,
    OnLogout,
    OnUserInList,
    OnChat,
    OnPm,
    OnSearch,
    OnConnectToMe,
    OnMyInfo,
    OnFirstMyInfo,
    OnKick,
    OnBan,
    OnUnBan,
    OnOperatorCommand,
    OnUnknownFrame,
}

/// Whether a hook callback wants the default handler action to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    Continue,
    Consumed,
}

type Callback = Box<dyn Fn(&mut ConnCtx, &str) -> HookResult + Send + Sync>;

/// Registration-order callback list per event, shared (read-only after
/// startup) across every connection task.
#[derive(Default)]
pub struct Hooks {
    new_conn: Vec<Callback>,
    close_conn: Vec<Callback>,
    chat: Vec<Callback>,
    pm: Vec<Callback>,
    search: Vec<Callback>,
    connect_to_me: Vec<Callback>,
    my_info: Vec<Callback>,
    first_my_info: Vec<Callback>,
    kick: Vec<Callback>,
    ban: Vec<Callback>,
    unban: Vec<Callback>,
    login: Vec<Callback>,
    logout: Vec<Callback>,
    user_in_list: Vec<Callback>,
    operator_command: Vec<Callback>,
    unknown_frame: Vec<Callback>,
}

impl Hooks {
    pub fn new() -> Self {
        Hooks::default()
    }

    pub fn register<F>(&mut self, event: HookEvent, callback: F)
    where
        F: Fn(&mut ConnCtx, &str) -> HookResult + Send + Sync + 'static,
    {
        let slot = self.slot_mut(event);
        slot.push(Box::new(callback));
    }

    fn slot_mut(&mut self, event: HookEvent) -> &mut Vec<Callback> {
        match event {
            HookEvent::OnNewConn => &mut self.new_conn,
            HookEvent::OnCloseConn => &mut self.close_conn,
            HookEvent::OnChat => &mut self.chat,
            HookEvent::OnPm => &mut self.pm,
            HookEvent::OnSearch => &mut self.search,
            HookEvent::OnConnectToMe => &mut self.connect_to_me,
            HookEvent::OnMyInfo => &mut self.my_info,
            HookEvent::OnFirstMyInfo => &mut self.first_my_info,
            HookEvent::OnKick => &mut self.kick,
            HookEvent::OnBan => &mut self.ban,
            HookEvent::OnUnBan => &mut self.unban,
            HookEvent::OnLogin => &mut self.login,
            HookEvent::OnLogout => &mut self.logout,
            HookEvent::OnUserInList => &mut self.user_in_list,
            HookEvent::OnOperatorCommand => &mut self.operator_command,
            HookEvent::OnUnknownFrame => &mut self.unknown_frame,
        }
    }

    fn slot(&self, event: HookEvent) -> &[Callback] {
        match event {
            HookEvent::OnNewConn => &self.new_conn,
            HookEvent::OnCloseConn => &self.close_conn,
            HookEvent::OnChat => &self.chat,
            HookEvent::OnPm => &self.pm,
            HookEvent::OnSearch => &self.search,
            HookEvent::OnConnectToMe => &self.connect_to_me,
            HookEvent::OnMyInfo => &self.my_info,
            HookEvent::OnFirstMyInfo => &self.first_my_info,
            HookEvent::OnKick => &self.kick,
            HookEvent::OnBan => &self.ban,
            HookEvent::OnUnBan => &self.unban,
            HookEvent::OnLogin => &self.login,
            HookEvent::OnLogout => &self.logout,
            HookEvent::OnUserInList => &self.user_in_list,
            HookEvent::OnOperatorCommand => &self.operator_command,
            HookEvent::OnUnknownFrame => &self.unknown_frame,
        }
    }

    /// Run every registered callback for `event` in order, stopping as
    /// soon as one reports `Consumed`.
    pub fn dispatch(&self, event: HookEvent, ctx: &mut ConnCtx, payload: &str) -> HookResult {
        for cb in self.slot(event) {
            if cb(ctx, payload) == HookResult::Consumed {
                return HookResult::Consumed;
            }
        }
        HookResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::context::tests_support::test_ctx;

    #[tokio::test]
    async fn first_consuming_callback_stops_the_chain() {
        let mut hooks = Hooks::new();
        hooks.register(HookEvent::OnChat, |_ctx, _payload| HookResult::Consumed);
        hooks.register(HookEvent::OnChat, |_ctx, _payload| panic!("should not run"));
        let mut ctx = test_ctx(Some("alice")).await;
        assert_eq!(hooks.dispatch(HookEvent::OnChat, &mut ctx, "hi"), HookResult::Consumed);
    }

    #[tokio::test]
    async fn event_with_no_callbacks_continues() {
        let hooks = Hooks::new();
        let mut ctx = test_ctx(Some("alice")).await;
        assert_eq!(hooks.dispatch(HookEvent::OnLogin, &mut ctx, ""), HookResult::Continue);
    }
}
