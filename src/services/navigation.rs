use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    Bills,
    NewBill,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Bills => "#employee/bills",
            Route::NewBill => "#employee/bill/new",
        }
    }
}

/// Receives navigation signals from the bill views.
pub trait Navigator {
    fn navigate(&self, route: Route);
}

impl<F> Navigator for F
where
    F: Fn(Route),
{
    fn navigate(&self, route: Route) {
        self(route)
    }
}
