//! Shared harness for integration tests.

use auditlink_netlink::AuditClient;
use auditlink_test::MockKernel;

/// A client wired to a mock kernel, plus a handle on the kernel side.
#[allow(dead_code)]
pub struct KernelHarness {
    /// Client under test.
    pub client: AuditClient<MockKernel>,
    /// Shared handle for queueing replies and inspecting requests.
    pub kernel: MockKernel,
}

#[allow(dead_code)]
impl KernelHarness {
    /// Harness around `kernel`.
    pub fn new(kernel: MockKernel) -> Self {
        auditlink_test::setup_test_logging("auditlink_netlink=debug");
        Self {
            client: AuditClient::with_transport(kernel.clone()),
            kernel,
        }
    }

    /// Harness whose kernel acknowledges every request asking for it.
    pub fn acking() -> Self {
        Self::new(MockKernel::new().with_auto_ack())
    }
}
