/// Power manager hook poked when a good scan arrives, so the device stays
/// awake without turning the display on
pub trait UserActivity: Send + Sync {
    fn notify_user_activity(&self, user_id: i32);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUserActivity;

impl UserActivity for NoopUserActivity {
    fn notify_user_activity(&self, _user_id: i32) {}
}
