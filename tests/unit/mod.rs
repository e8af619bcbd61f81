mod boundary_tests;
mod invariant_tests;
mod scenario_tests;
