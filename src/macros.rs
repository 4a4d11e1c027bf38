// Assertion shorthands. Each one records the stringified expression so a
// failure reads like the source line that produced it.

/// Checks a condition; the test keeps running if it fails.
///
/// ```ignore
/// check!(ctx, list.is_empty());
/// check!(ctx, value < 10, "value {} is out of range", value);
/// ```
#[macro_export]
macro_rules! check {
	($ctx:expr, $cond:expr $(,)?) => {
		$ctx.check($cond, stringify!($cond))
	};
	($ctx:expr, $cond:expr, $($arg:tt)+) => {
		$ctx.check($cond, format!($($arg)+))
	};
}

/// Checks a condition and returns `Err(Abort)` from the enclosing test body
/// if it fails.
#[macro_export]
macro_rules! require {
	($ctx:expr, $cond:expr $(,)?) => {
		$ctx.require($cond, stringify!($cond))?
	};
	($ctx:expr, $cond:expr, $($arg:tt)+) => {
		$ctx.require($cond, format!($($arg)+))?
	};
}

#[macro_export]
macro_rules! check_eq {
	($ctx:expr, $left:expr, $right:expr $(,)?) => {
		$ctx.check_eq(&$left, &$right, concat!(stringify!($left), " == ", stringify!($right)))
	};
}

#[macro_export]
macro_rules! check_ne {
	($ctx:expr, $left:expr, $right:expr $(,)?) => {
		$ctx.check_ne(&$left, &$right, concat!(stringify!($left), " != ", stringify!($right)))
	};
}

#[macro_export]
macro_rules! require_eq {
	($ctx:expr, $left:expr, $right:expr $(,)?) => {
		$ctx.require_eq(&$left, &$right, concat!(stringify!($left), " == ", stringify!($right)))?
	};
}

#[macro_export]
macro_rules! require_ne {
	($ctx:expr, $left:expr, $right:expr $(,)?) => {
		$ctx.require_ne(&$left, &$right, concat!(stringify!($left), " != ", stringify!($right)))?
	};
}

/// Checks that an expression panics.
#[macro_export]
macro_rules! check_panics {
	($ctx:expr, $code:expr $(,)?) => {
		$ctx.check_panics(|| { let _ = $code; }, concat!(stringify!($code), " panics"))
	};
}
