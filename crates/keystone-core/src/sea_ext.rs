use sea_orm::{EntityTrait, QuerySelect, Select};

use keystone_domain::pagination::Window;

pub trait SelectWindow {
    /// Apply a clamped `limit`/`skip` window to the query.
    fn window(self, window: Window) -> Self;
}

impl<E> SelectWindow for Select<E>
where
    E: EntityTrait,
{
    fn window(self, window: Window) -> Self {
        let Window { limit, skip } = window.clamped();
        self.limit(limit).offset(skip)
    }
}
