// Cross-component tests: everything that needs a whole machine rather than
// a single module.


mod interrupt_tests;
mod pipeline_tests;
